//! BSON marshalling (document wire format)
//!
//! Same rules as the JSON codec, except instants use the store's native
//! datetime type and 32/64-bit integers keep their width.

use std::str::FromStr;

use bson::Bson;
use rust_decimal::Decimal;

use crate::storage::{StorageError, StorageResult};
use crate::value::{FieldKind, Value};

/// Encode a value for the document store.
#[must_use]
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Id(id) => Bson::String(id.to_string()),
        Value::Instant(ts) => Bson::DateTime(bson::DateTime::from_chrono(*ts)),
        Value::Enum(name) => Bson::String(name.clone()),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Int(v) => Bson::Int32(*v),
        Value::BigInt(v) => Bson::Int64(*v),
        Value::Bool(v) => Bson::Boolean(*v),
        Value::Float(v) => Bson::Double(f64::from(*v)),
        Value::Double(v) => Bson::Double(*v),
        Value::Decimal(v) => Bson::String(v.to_string()),
    }
}

/// Decode a document field into the kind its target field declares.
///
/// # Errors
/// `Assembly` when the raw value cannot be read as the declared kind.
pub fn from_bson(kind: FieldKind, raw: &Bson) -> StorageResult<Value> {
    if matches!(raw, Bson::Null) {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Id => {
            let s = expect_str(kind, raw)?;
            crate::ids::parse(s)
                .map(Value::Id)
                .map_err(|e| StorageError::assembly(format!("bad identifier {s:?}: {e}")))
        }
        FieldKind::Instant => match raw {
            Bson::DateTime(ts) => Ok(Value::Instant(ts.to_chrono())),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::Enum => Ok(Value::Enum(expect_str(kind, raw)?.to_string())),
        FieldKind::Text => Ok(Value::Text(expect_str(kind, raw)?.to_string())),
        FieldKind::Int => match raw {
            Bson::Int32(v) => Ok(Value::Int(*v)),
            Bson::Int64(v) => i32::try_from(*v)
                .map(Value::Int)
                .map_err(|_| StorageError::assembly(format!("{v} overflows int"))),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::BigInt => match raw {
            Bson::Int64(v) => Ok(Value::BigInt(*v)),
            Bson::Int32(v) => Ok(Value::BigInt(i64::from(*v))),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::Bool => match raw {
            Bson::Boolean(v) => Ok(Value::Bool(*v)),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::Float => match raw {
            Bson::Double(v) => Ok(Value::Float(*v as f32)),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::Double => match raw {
            Bson::Double(v) => Ok(Value::Double(*v)),
            _ => Err(mismatch(kind, raw)),
        },
        FieldKind::Decimal => {
            let s = expect_str(kind, raw)?;
            Decimal::from_str(s)
                .map(Value::Decimal)
                .map_err(|e| StorageError::assembly(format!("bad decimal {s:?}: {e}")))
        }
    }
}

fn expect_str(kind: FieldKind, raw: &Bson) -> StorageResult<&str> {
    match raw {
        Bson::String(s) => Ok(s),
        _ => Err(mismatch(kind, raw)),
    }
}

fn mismatch(kind: FieldKind, raw: &Bson) -> StorageError {
    StorageError::assembly(format!("expected {kind}, found {raw}"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn round_trip(kind: FieldKind, value: Value) {
        let wire = to_bson(&value);
        assert_eq!(from_bson(kind, &wire).unwrap(), value);
    }

    #[test]
    fn test_round_trip_every_kind() {
        round_trip(FieldKind::Id, Value::Id(crate::ids::random()));
        // bson datetimes carry millisecond precision
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        round_trip(FieldKind::Instant, Value::Instant(ts));
        round_trip(FieldKind::Enum, Value::Enum("SILVER".into()));
        round_trip(FieldKind::Text, Value::Text("hello".into()));
        round_trip(FieldKind::Int, Value::Int(-7));
        round_trip(FieldKind::BigInt, Value::BigInt(1 << 40));
        round_trip(FieldKind::Bool, Value::Bool(false));
        round_trip(FieldKind::Double, Value::Double(2.5));
        round_trip(FieldKind::Decimal, Value::Decimal("99.0001".parse().unwrap()));
    }

    #[test]
    fn test_null_round_trips() {
        assert_eq!(to_bson(&Value::Null), Bson::Null);
        assert_eq!(from_bson(FieldKind::Text, &Bson::Null).unwrap(), Value::Null);
        assert_eq!(from_bson(FieldKind::Instant, &Bson::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_integer_widths_coerce() {
        assert_eq!(
            from_bson(FieldKind::BigInt, &Bson::Int32(5)).unwrap(),
            Value::BigInt(5)
        );
        assert_eq!(
            from_bson(FieldKind::Int, &Bson::Int64(5)).unwrap(),
            Value::Int(5)
        );
        let err = from_bson(FieldKind::Int, &Bson::Int64(i64::MAX)).unwrap_err();
        assert!(matches!(err, StorageError::Assembly { .. }));
    }

    #[test]
    fn test_kind_mismatch_is_assembly_failure() {
        let err = from_bson(FieldKind::Bool, &Bson::String("yes".into())).unwrap_err();
        assert!(matches!(err, StorageError::Assembly { .. }));
    }
}
