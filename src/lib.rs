//! # Polystore
//!
//! A polymorphic persistence layer: one entity definition, a plain data
//! record plus static storage metadata, persists interchangeably against a
//! relational backend, a document-store backend, or a flat-file snapshot
//! backend, without call sites knowing which is active.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Storage<E> Trait                     │
//! │   insert · update · upsert · find · delete · batches     │
//! ├─────────────────────────────────────────────────────────┤
//! │  EntityMeta (cached)  │  IndexDef list  │  Value codec   │
//! ├─────────────────────────────────────────────────────────┤
//! │  SqlStorage           │  MongoStorage   │ SnapshotStorage│
//! │  DDL + drift + index  │  index catalog  │ atomic file    │
//! │  reconciliation       │  reconciliation │ replacement    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use polystore::meta::{EntitySpec, FieldSpec};
//! use polystore::storage::{SnapshotConfig, SnapshotStorage, Storage, StorageResult};
//! use polystore::{Entity, FieldKind, Value};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Player {
//!     id: Option<uuid::Uuid>,
//!     name: String,
//! }
//!
//! impl Entity for Player {
//!     fn spec() -> &'static EntitySpec {
//!         static SPEC: EntitySpec = EntitySpec::new(
//!             "Player",
//!             &[
//!                 FieldSpec::new("id", FieldKind::Id).primary_key(),
//!                 FieldSpec::new("name", FieldKind::Text).required().unique(),
//!             ],
//!         );
//!         &SPEC
//!     }
//!
//!     fn get(&self, field: &str) -> Value {
//!         match field {
//!             "id" => self.id.into(),
//!             "name" => Value::Text(self.name.clone()),
//!             _ => Value::Null,
//!         }
//!     }
//!
//!     fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
//!         match (field, value) {
//!             ("id", Value::Id(v)) => self.id = Some(v),
//!             ("id", Value::Null) => self.id = None,
//!             ("name", Value::Text(v)) => self.name = v,
//!             (f, v) => {
//!                 return Err(polystore::StorageError::assembly(format!("{f}: {v:?}")))
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> StorageResult<()> {
//! let store = SnapshotStorage::<Player>::new(&SnapshotConfig::new("./data"));
//! store.init().await?;
//!
//! let mut player = Player { id: None, name: "arwen".into() };
//! store.insert(&mut player).await?; // identifier auto-assigned
//! assert_eq!(store.count().await?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! The relational backend (`sql` feature) adds schema creation, explicit
//! schema-drift diff/apply, and dialect-aware index reconciliation; the
//! document backend (`mongo` feature) reconciles indexes against the
//! store's own catalog and offers optional session transactions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod constants;
pub mod entity;
pub mod ids;
pub mod meta;
pub mod storage;
pub mod value;

// Re-export common types
pub use entity::{primary_key_of, same_identity, set_primary_key, Entity, Stamps};
pub use meta::{indexes_for, EntityMeta, IndexDef};
pub use storage::{keys_of, SnapshotConfig, SnapshotStorage, Storage, StorageError, StorageResult};
pub use value::{FieldKind, Value};

#[cfg(feature = "sql")]
pub use storage::{Dialect, SchemaDiff, SqlConfig, SqlStorage};

#[cfg(feature = "mongo")]
pub use storage::{MongoConfig, MongoStorage};
