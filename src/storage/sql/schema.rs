//! Schema generation
//!
//! Derives `CREATE TABLE IF NOT EXISTS` one-to-one from an entity's
//! persisted fields via a fixed kind-to-column-type table. The canonical
//! spellings are what the drift inspector compares against after
//! normalization, so the two tables must stay consistent.

use super::Dialect;
use crate::constants::{
    SQL_DECIMAL_PRECISION, SQL_DECIMAL_SCALE, SQL_ENUM_LEN, SQL_ID_LEN, SQL_TEXT_LEN_DEFAULT,
};
use crate::meta::EntityMeta;
use crate::value::FieldKind;

/// Dialect-specific column type for a field kind.
#[must_use]
pub(crate) fn ddl_type(kind: FieldKind, dialect: Dialect) -> String {
    match kind {
        FieldKind::Text => format!("VARCHAR({SQL_TEXT_LEN_DEFAULT})"),
        FieldKind::Int => "INT".to_string(),
        FieldKind::BigInt => "BIGINT".to_string(),
        FieldKind::Bool => "BOOLEAN".to_string(),
        FieldKind::Double => match dialect {
            Dialect::Postgres => "DOUBLE PRECISION".to_string(),
            Dialect::MySql => "DOUBLE".to_string(),
        },
        FieldKind::Float => match dialect {
            Dialect::Postgres => "REAL".to_string(),
            // MySQL REAL is an alias for DOUBLE; FLOAT is the 4-byte type
            Dialect::MySql => "FLOAT".to_string(),
        },
        FieldKind::Decimal => format!("DECIMAL({SQL_DECIMAL_PRECISION},{SQL_DECIMAL_SCALE})"),
        FieldKind::Instant => match dialect {
            Dialect::Postgres => "TIMESTAMPTZ".to_string(),
            Dialect::MySql => "TIMESTAMP".to_string(),
        },
        FieldKind::Enum => format!("VARCHAR({SQL_ENUM_LEN})"),
        FieldKind::Id => format!("VARCHAR({SQL_ID_LEN})"),
    }
}

/// Dialect-free canonical spelling, the drift inspector's comparison form.
#[must_use]
pub(crate) fn canonical_type(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => format!("VARCHAR({SQL_TEXT_LEN_DEFAULT})"),
        FieldKind::Int => "INT".to_string(),
        FieldKind::BigInt => "BIGINT".to_string(),
        FieldKind::Bool => "BOOLEAN".to_string(),
        FieldKind::Double => "DOUBLE".to_string(),
        FieldKind::Float => "REAL".to_string(),
        FieldKind::Decimal => format!("DECIMAL({SQL_DECIMAL_PRECISION},{SQL_DECIMAL_SCALE})"),
        FieldKind::Instant => "TIMESTAMP".to_string(),
        FieldKind::Enum => format!("VARCHAR({SQL_ENUM_LEN})"),
        FieldKind::Id => format!("VARCHAR({SQL_ID_LEN})"),
    }
}

/// Build the `CREATE TABLE IF NOT EXISTS` statement for an entity type.
#[must_use]
pub(crate) fn create_table_sql(meta: &EntityMeta, dialect: Dialect) -> String {
    let mut columns = Vec::with_capacity(meta.persisted_fields().len());
    for field in meta.persisted_fields() {
        let mut column = format!("{} {}", field.name, ddl_type(field.kind, dialect));
        if field.primary_key {
            column.push_str(" PRIMARY KEY");
        } else if field.required {
            column.push_str(" NOT NULL");
        }
        columns.push(column);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        meta.table_name(),
        columns.join(", ")
    )
}

// =============================================================================
// Tests
// =============================================================================
