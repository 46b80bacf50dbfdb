//! Storage - contract and backends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Storage<E> Trait                       │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                    ↑                    ↑
//!          │                    │                    │
//! ┌────────┴────────┐  ┌────────┴────────┐  ┌───────┴─────────┐
//! │   SqlStorage    │  │  MongoStorage   │  │ SnapshotStorage │
//! │ (postgres/mysql)│  │   (document)    │  │  (json file)    │
//! └─────────────────┘  └─────────────────┘  └─────────────────┘
//! ```
//!
//! Every backend implements the same contract with identical semantics;
//! call sites never know which one is active.

mod backend;
mod error;
mod snapshot;

#[cfg(feature = "sql")]
mod sql;

#[cfg(feature = "mongo")]
mod mongo;

pub use backend::{keys_of, Storage};
pub use error::{StorageError, StorageResult};
pub use snapshot::{SnapshotConfig, SnapshotStorage};

#[cfg(feature = "sql")]
pub use sql::{Dialect, SchemaDiff, SqlConfig, SqlStorage};

#[cfg(feature = "mongo")]
pub use mongo::{MongoConfig, MongoStorage};
