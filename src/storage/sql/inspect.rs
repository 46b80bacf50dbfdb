//! Schema drift inspection
//!
//! Compares the live column catalog against the columns the entity metadata
//! expects and produces an ordered `ALTER TABLE` statement list: additions
//! first, then type/nullability changes, then (opt-in, destructive) drops.
//! Vendor type spellings are collapsed to a canonical form on both sides
//! before comparison so cosmetic differences never register as drift.
//! Applying a diff is all-or-nothing: one transaction, full rollback on any
//! failure.

use sqlx::Row;
use tracing::debug;

use super::schema::{canonical_type, ddl_type};
use super::{Dialect, SqlPool, SqlStorage};
use crate::entity::Entity;
use crate::meta::EntityMeta;
use crate::storage::{StorageError, StorageResult};

// =============================================================================
// SchemaDiff
// =============================================================================

/// Ordered migration statements produced by [`SqlStorage::diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    statements: Vec<String>,
}

impl SchemaDiff {
    /// The migration statements, in application order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Whether the live table already matches the entity metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

// =============================================================================
// Column Models
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LiveColumn {
    pub(crate) name: String,
    /// Normalized canonical type
    pub(crate) canonical: String,
    pub(crate) nullable: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ExpectedColumn {
    pub(crate) name: &'static str,
    pub(crate) canonical: String,
    pub(crate) ddl: String,
    pub(crate) nullable: bool,
}

pub(crate) fn expected_columns(meta: &EntityMeta, dialect: Dialect) -> Vec<ExpectedColumn> {
    meta.persisted_fields()
        .iter()
        .map(|field| ExpectedColumn {
            name: field.name,
            canonical: canonical_type(field.kind),
            ddl: ddl_type(field.kind, dialect),
            nullable: !field.required,
        })
        .collect()
}

// =============================================================================
// Type Normalization
// =============================================================================

/// Collapse a vendor type spelling to its canonical form: any character
/// type becomes `VARCHAR(n)`, numeric/decimal become `DECIMAL(p,s)`,
/// integer widths, boolean spellings (`BIT`, `BOOL`; MySQL's `tinyint(1)`
/// is pre-mapped by the catalog reader), float spellings, and
/// timestamp/datetime all collapse likewise.
#[must_use]
pub(crate) fn normalize_type(raw: &str, size: i64, scale: i64) -> String {
    let t = raw.trim().to_uppercase();
    if t.contains("CHAR") {
        return format!("VARCHAR({})", size.max(1));
    }
    if t.starts_with("DEC") || t.starts_with("NUM") {
        let precision = if size > 0 { size } else { 38 };
        return format!("DECIMAL({precision},{})", scale.max(0));
    }
    if t.starts_with("BIGINT") {
        return "BIGINT".to_string();
    }
    if t.starts_with("BIT") || t.starts_with("BOOL") {
        return "BOOLEAN".to_string();
    }
    if t.starts_with("INT") {
        return "INT".to_string();
    }
    if t.starts_with("DOUBLE") {
        return "DOUBLE".to_string();
    }
    if t.starts_with("REAL") || t.starts_with("FLOAT") {
        return "REAL".to_string();
    }
    if t.starts_with("TIMESTAMP") || t.starts_with("DATETIME") {
        return "TIMESTAMP".to_string();
    }
    t
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

// =============================================================================
// Diff
// =============================================================================

pub(crate) fn diff_from(
    table: &str,
    dialect: Dialect,
    expected: &[ExpectedColumn],
    actual: &[LiveColumn],
    drop_unknown: bool,
) -> SchemaDiff {
    let mut statements = Vec::new();

    for column in expected {
        if !actual.iter().any(|a| a.name == column.name) {
            statements.push(add_column_sql(table, column));
        }
    }

    for column in expected {
        let Some(live) = actual.iter().find(|a| a.name == column.name) else {
            continue;
        };
        let type_drift = squash(&live.canonical) != squash(&column.canonical);
        if type_drift || live.nullable != column.nullable {
            statements.push(modify_column_sql(table, column, dialect));
        }
    }

    if drop_unknown {
        for live in actual {
            if !expected.iter().any(|e| e.name == live.name) {
                statements.push(format!("ALTER TABLE {table} DROP COLUMN {}", live.name));
            }
        }
    }

    SchemaDiff { statements }
}

fn add_column_sql(table: &str, column: &ExpectedColumn) -> String {
    let not_null = if column.nullable { "" } else { " NOT NULL" };
    format!(
        "ALTER TABLE {table} ADD COLUMN {} {}{not_null}",
        column.name, column.ddl
    )
}

fn modify_column_sql(table: &str, column: &ExpectedColumn, dialect: Dialect) -> String {
    let not_null = if column.nullable { "" } else { " NOT NULL" };
    match dialect {
        Dialect::MySql => format!(
            "ALTER TABLE {table} MODIFY {} {}{not_null}",
            column.name, column.ddl
        ),
        Dialect::Postgres => {
            let null_action = if column.nullable { "DROP" } else { "SET" };
            format!(
                "ALTER TABLE {table} ALTER COLUMN {name} TYPE {ddl}, ALTER COLUMN {name} {null_action} NOT NULL",
                name = column.name,
                ddl = column.ddl,
            )
        }
    }
}

// =============================================================================
// Live Catalog
// =============================================================================

pub(crate) async fn live_columns<E: Entity>(
    storage: &SqlStorage<E>,
) -> StorageResult<Vec<LiveColumn>> {
    let table = storage.meta.table_name();
    match &storage.pool {
        SqlPool::Postgres(pool) => {
            let rows = sqlx::query(
                r"
                SELECT column_name, data_type,
                       COALESCE(character_maximum_length, numeric_precision, 0)::bigint AS type_size,
                       COALESCE(numeric_scale, 0)::bigint AS type_scale,
                       is_nullable
                FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1
                ORDER BY ordinal_position
                ",
            )
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(|e| StorageError::io(format!("failed to describe {table}: {e}")))?;

            rows.iter()
                .map(|row| {
                    let name: String = row.try_get("column_name").map_err(catalog_err)?;
                    let data_type: String = row.try_get("data_type").map_err(catalog_err)?;
                    let size: i64 = row.try_get("type_size").map_err(catalog_err)?;
                    let scale: i64 = row.try_get("type_scale").map_err(catalog_err)?;
                    let nullable: String = row.try_get("is_nullable").map_err(catalog_err)?;
                    Ok(LiveColumn {
                        name,
                        canonical: normalize_type(&data_type, size, scale),
                        nullable: nullable.eq_ignore_ascii_case("YES"),
                    })
                })
                .collect()
        }
        SqlPool::MySql(pool) => {
            let rows = sqlx::query(
                r"
                SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type,
                       CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, 0) AS SIGNED) AS type_size,
                       CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS type_scale,
                       IS_NULLABLE AS is_nullable, COLUMN_TYPE AS column_type
                FROM information_schema.columns
                WHERE table_schema = DATABASE() AND table_name = ?
                ORDER BY ordinal_position
                ",
            )
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(|e| StorageError::io(format!("failed to describe {table}: {e}")))?;

            rows.iter()
                .map(|row| {
                    let name: String = row.try_get("column_name").map_err(catalog_err)?;
                    let mut data_type: String = row.try_get("data_type").map_err(catalog_err)?;
                    let size: i64 = row.try_get("type_size").map_err(catalog_err)?;
                    let scale: i64 = row.try_get("type_scale").map_err(catalog_err)?;
                    let nullable: String = row.try_get("is_nullable").map_err(catalog_err)?;
                    let column_type: String = row.try_get("column_type").map_err(catalog_err)?;
                    // MySQL spells BOOLEAN as tinyint(1)
                    if data_type.eq_ignore_ascii_case("tinyint")
                        && column_type.to_lowercase().starts_with("tinyint(1)")
                    {
                        data_type = "BOOLEAN".to_string();
                    }
                    Ok(LiveColumn {
                        name,
                        canonical: normalize_type(&data_type, size, scale),
                        nullable: nullable.eq_ignore_ascii_case("YES"),
                    })
                })
                .collect()
        }
    }
}

fn catalog_err(e: sqlx::Error) -> StorageError {
    StorageError::io(format!("bad catalog row: {e}"))
}

// =============================================================================
// Apply
// =============================================================================

/// Run every statement of the diff inside one transaction.
pub(crate) async fn apply<E: Entity>(
    storage: &SqlStorage<E>,
    diff: &SchemaDiff,
) -> StorageResult<()> {
    if diff.is_empty() {
        return Ok(());
    }
    match &storage.pool {
        SqlPool::Postgres(pool) => {
            let mut tx = pool
                .begin()
                .await
                .map_err(|e| StorageError::io(format!("failed to begin migration: {e}")))?;
            for statement in diff.statements() {
                debug!(statement, "applying migration statement");
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StorageError::io(format!("migration failed: {e}")))?;
            }
            tx.commit()
                .await
                .map_err(|e| StorageError::io(format!("failed to commit migration: {e}")))
        }
        SqlPool::MySql(pool) => {
            let mut tx = pool
                .begin()
                .await
                .map_err(|e| StorageError::io(format!("failed to begin migration: {e}")))?;
            for statement in diff.statements() {
                debug!(statement, "applying migration statement");
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| StorageError::io(format!("migration failed: {e}")))?;
            }
            tx.commit()
                .await
                .map_err(|e| StorageError::io(format!("failed to commit migration: {e}")))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
