//! Relational index reconciliation
//!
//! Enumerates the live index catalog, groups it by name, and reconciles the
//! resolved declarations against it by name *and* shape (uniqueness plus
//! ordered column set): matching indexes are left untouched, a same-named
//! index with a different shape is dropped and recreated, absent ones are
//! created. Neither dialect gets `IF NOT EXISTS`; the catalog check is the guard,
//! so a second run issues zero statements.

use std::collections::HashMap;

use sqlx::Row;
use tracing::{debug, info};

use super::{Dialect, SqlPool, SqlStorage};
use crate::entity::Entity;
use crate::meta::IndexDef;
use crate::storage::{StorageError, StorageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LiveIndex {
    pub(crate) name: String,
    pub(crate) unique: bool,
    pub(crate) columns: Vec<String>,
}

impl LiveIndex {
    fn matches(&self, def: &IndexDef) -> bool {
        self.unique == def.unique && self.columns == def.columns
    }
}

pub(crate) fn create_index_sql(table: &str, def: &IndexDef) -> String {
    let verb = if def.unique {
        "CREATE UNIQUE INDEX"
    } else {
        "CREATE INDEX"
    };
    format!("{verb} {} ON {table} ({})", def.name, def.columns.join(","))
}

pub(crate) fn drop_index_sql(table: &str, name: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres => format!("DROP INDEX {name}"),
        Dialect::MySql => format!("DROP INDEX {name} ON {table}"),
    }
}

// =============================================================================
// Live Catalog
// =============================================================================

/// Load the live secondary indexes of the table, grouped by name with
/// columns in ordinal position. Indexes backing the primary key are skipped.
pub(crate) async fn live_indexes<E: Entity>(
    storage: &SqlStorage<E>,
) -> StorageResult<HashMap<String, LiveIndex>> {
    let table = storage.meta.table_name();
    let mut grouped: HashMap<String, LiveIndex> = HashMap::new();

    match &storage.pool {
        SqlPool::Postgres(pool) => {
            let rows = sqlx::query(
                r"
                SELECT i.relname AS index_name, ix.indisunique AS is_unique,
                       a.attname AS column_name,
                       array_position(ix.indkey::int2[], a.attnum) AS ordinal
                FROM pg_class t
                JOIN pg_index ix ON t.oid = ix.indrelid
                JOIN pg_class i ON i.oid = ix.indexrelid
                JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
                WHERE t.relname = $1 AND NOT ix.indisprimary
                ORDER BY i.relname, ordinal
                ",
            )
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(|e| StorageError::io(format!("failed to list indexes of {table}: {e}")))?;

            for row in &rows {
                let name: String = row.try_get("index_name").map_err(index_err)?;
                let unique: bool = row.try_get("is_unique").map_err(index_err)?;
                let column: String = row.try_get("column_name").map_err(index_err)?;
                grouped
                    .entry(name.clone())
                    .or_insert_with(|| LiveIndex {
                        name,
                        unique,
                        columns: Vec::new(),
                    })
                    .columns
                    .push(column);
            }
        }
        SqlPool::MySql(pool) => {
            let rows = sqlx::query(
                r"
                SELECT INDEX_NAME AS index_name,
                       CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                       COLUMN_NAME AS column_name
                FROM information_schema.statistics
                WHERE table_schema = DATABASE() AND table_name = ? AND INDEX_NAME <> 'PRIMARY'
                ORDER BY INDEX_NAME, SEQ_IN_INDEX
                ",
            )
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(|e| StorageError::io(format!("failed to list indexes of {table}: {e}")))?;

            for row in &rows {
                let name: String = row.try_get("index_name").map_err(index_err)?;
                let non_unique: i64 = row.try_get("non_unique").map_err(index_err)?;
                let column: Option<String> = row.try_get("column_name").map_err(index_err)?;
                let Some(column) = column else {
                    continue; // functional index parts carry no plain column
                };
                grouped
                    .entry(name.clone())
                    .or_insert_with(|| LiveIndex {
                        name,
                        unique: non_unique == 0,
                        columns: Vec::new(),
                    })
                    .columns
                    .push(column);
            }
        }
    }

    Ok(grouped)
}

fn index_err(e: sqlx::Error) -> StorageError {
    StorageError::io(format!("bad index catalog row: {e}"))
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconcile every resolved index definition against the live catalog.
pub(crate) async fn ensure_indexes<E: Entity>(storage: &SqlStorage<E>) -> StorageResult<()> {
    let table = storage.meta.table_name();
    let existing = live_indexes(storage).await?;

    for def in storage.meta.indexes() {
        match existing.get(&def.name) {
            Some(live) if live.matches(def) => {
                debug!(index = %def.name, "index up to date");
            }
            Some(_) => {
                info!(index = %def.name, "index shape changed, recreating");
                storage
                    .execute_raw(&drop_index_sql(table, &def.name, storage.dialect))
                    .await?;
                storage.execute_raw(&create_index_sql(table, def)).await?;
            }
            None => {
                info!(index = %def.name, "creating index");
                storage.execute_raw(&create_index_sql(table, def)).await?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, unique: bool, columns: &[&str]) -> IndexDef {
        IndexDef {
            name: name.to_string(),
            unique,
            columns: columns.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_create_index_sql() {
        assert_eq!(
            create_index_sql("player", &def("uq_player_name", true, &["name"])),
            "CREATE UNIQUE INDEX uq_player_name ON player (name)"
        );
        assert_eq!(
            create_index_sql("player", &def("idx_player_name_rank", false, &["name", "rank"])),
            "CREATE INDEX idx_player_name_rank ON player (name,rank)"
        );
    }

    #[test]
    fn test_drop_index_sql_by_dialect() {
        assert_eq!(
            drop_index_sql("player", "idx_player_rank", Dialect::Postgres),
            "DROP INDEX idx_player_rank"
        );
        assert_eq!(
            drop_index_sql("player", "idx_player_rank", Dialect::MySql),
            "DROP INDEX idx_player_rank ON player"
        );
    }

    #[test]
    fn test_live_index_matching_compares_shape() {
        let live = LiveIndex {
            name: "uq_player_name".into(),
            unique: true,
            columns: vec!["name".into()],
        };
        assert!(live.matches(&def("uq_player_name", true, &["name"])));
        assert!(!live.matches(&def("uq_player_name", false, &["name"])));
        assert!(!live.matches(&def("uq_player_name", true, &["name", "rank"])));
    }
}
