//! Value - the closed set of persistable field values
//!
//! Every field an entity persists is one of these kinds. Backends never
//! inspect a runtime type: marshalling always matches on the *declared*
//! [`FieldKind`] of the target field, in both directions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

// =============================================================================
// FieldKind
// =============================================================================

/// Declared kind of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Opaque 128-bit identifier, marshalled as its canonical string form
    Id,
    /// Point in time, marshalled as the backend's native timestamp type
    Instant,
    /// Enumeration, marshalled as its symbolic name string
    Enum,
    /// Bounded text
    Text,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    BigInt,
    /// Boolean
    Bool,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Fixed-precision decimal
    Decimal,
}

impl FieldKind {
    /// Get string representation (used in error messages).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Instant => "instant",
            Self::Enum => "enum",
            Self::Text => "text",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Value
// =============================================================================

/// A single persistable field value.
///
/// `Null` stands in for an unset field of any kind and round-trips to `Null`
/// through every backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Opaque identifier
    Id(Uuid),
    /// Point in time
    Instant(DateTime<Utc>),
    /// Enumeration symbolic name
    Enum(String),
    /// Text
    Text(String),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// Boolean
    Bool(bool),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Fixed-precision decimal
    Decimal(Decimal),
}

impl Value {
    /// Whether this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind this value belongs to, or `None` for `Null`.
    #[must_use]
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Id(_) => Some(FieldKind::Id),
            Self::Instant(_) => Some(FieldKind::Instant),
            Self::Enum(_) => Some(FieldKind::Enum),
            Self::Text(_) => Some(FieldKind::Text),
            Self::Int(_) => Some(FieldKind::Int),
            Self::BigInt(_) => Some(FieldKind::BigInt),
            Self::Bool(_) => Some(FieldKind::Bool),
            Self::Float(_) => Some(FieldKind::Float),
            Self::Double(_) => Some(FieldKind::Double),
            Self::Decimal(_) => Some(FieldKind::Decimal),
        }
    }

    /// Canonical textual form, used as the file backend's map key and in
    /// error messages. `Null` renders as `"null"`.
    #[must_use]
    pub fn key_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Id(id) => id.to_string(),
            Self::Instant(ts) => ts.to_rfc3339(),
            Self::Enum(name) => name.clone(),
            Self::Text(s) => s.clone(),
            Self::Int(v) => v.to_string(),
            Self::BigInt(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key_string())
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Instant(ts)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Value::from)
    }
}

// =============================================================================
// Tests
// =============================================================================
