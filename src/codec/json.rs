//! JSON marshalling (file snapshot wire format)
//!
//! Encoding is value-driven; decoding matches on the *declared* field kind,
//! so a stored string becomes an identifier or an enumeration name only when
//! the target field expects one.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::storage::{StorageError, StorageResult};
use crate::value::{FieldKind, Value};

/// Encode a value for the snapshot file. Instants render as RFC 3339,
/// identifiers and enumerations as strings, decimals as exact strings.
#[must_use]
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Id(id) => Json::String(id.to_string()),
        Value::Instant(ts) => Json::String(ts.to_rfc3339()),
        Value::Enum(name) => Json::String(name.clone()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Int(v) => Json::from(*v),
        Value::BigInt(v) => Json::from(*v),
        Value::Bool(v) => Json::Bool(*v),
        Value::Float(v) => Json::from(f64::from(*v)),
        Value::Double(v) => Json::from(*v),
        Value::Decimal(v) => Json::String(v.to_string()),
    }
}

/// Decode a snapshot field into the kind its target field declares.
///
/// # Errors
/// `Assembly` when the raw value cannot be read as the declared kind.
pub fn from_json(kind: FieldKind, raw: &Json) -> StorageResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Id => {
            let s = expect_str(kind, raw)?;
            crate::ids::parse(s)
                .map(Value::Id)
                .map_err(|e| StorageError::assembly(format!("bad identifier {s:?}: {e}")))
        }
        FieldKind::Instant => {
            let s = expect_str(kind, raw)?;
            DateTime::parse_from_rfc3339(s)
                .map(|ts| Value::Instant(ts.with_timezone(&Utc)))
                .map_err(|e| StorageError::assembly(format!("bad instant {s:?}: {e}")))
        }
        FieldKind::Enum => Ok(Value::Enum(expect_str(kind, raw)?.to_string())),
        FieldKind::Text => Ok(Value::Text(expect_str(kind, raw)?.to_string())),
        FieldKind::Int => {
            let v = raw
                .as_i64()
                .ok_or_else(|| mismatch(kind, raw))?;
            i32::try_from(v)
                .map(Value::Int)
                .map_err(|_| StorageError::assembly(format!("{v} overflows int")))
        }
        FieldKind::BigInt => raw.as_i64().map(Value::BigInt).ok_or_else(|| mismatch(kind, raw)),
        FieldKind::Bool => raw.as_bool().map(Value::Bool).ok_or_else(|| mismatch(kind, raw)),
        FieldKind::Float => raw
            .as_f64()
            .map(|v| Value::Float(v as f32))
            .ok_or_else(|| mismatch(kind, raw)),
        FieldKind::Double => raw.as_f64().map(Value::Double).ok_or_else(|| mismatch(kind, raw)),
        FieldKind::Decimal => {
            // written as a string, but tolerate a plain number
            let text = match raw {
                Json::String(s) => s.clone(),
                Json::Number(n) => n.to_string(),
                _ => return Err(mismatch(kind, raw)),
            };
            Decimal::from_str(&text)
                .map(Value::Decimal)
                .map_err(|e| StorageError::assembly(format!("bad decimal {text:?}: {e}")))
        }
    }
}

fn expect_str(kind: FieldKind, raw: &Json) -> StorageResult<&str> {
    raw.as_str().ok_or_else(|| mismatch(kind, raw))
}

fn mismatch(kind: FieldKind, raw: &Json) -> StorageError {
    StorageError::assembly(format!("expected {kind}, found {raw}"))
}

// =============================================================================
// Tests
// =============================================================================
