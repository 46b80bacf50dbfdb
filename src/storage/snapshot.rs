//! File snapshot backend
//!
//! An in-memory map mirrored to a single structured JSON file. Every
//! mutation updates memory first, then replaces the whole file through a
//! temporary sibling and an atomic rename, so a concurrent reader of the path
//! never observes a torn write.
//!
//! # Snapshot format
//!
//! One file per entity type, a single object with one field:
//!
//! ```json
//! {
//!   "data": [
//!     { "id": "6ba4281c-...", "name": "arwen", "rank": "GOLD" }
//!   ]
//! }
//! ```
//!
//! A zero-byte file (freshly created) reads as "no entities".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value as Json;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{collect_batch, save_all_workers, Storage};
use super::error::{StorageError, StorageResult};
use crate::codec::json::{from_json, to_json};
use crate::entity::{primary_key_of, set_primary_key, Entity};
use crate::ids;
use crate::meta::EntityMeta;
use crate::value::{FieldKind, Value};

// =============================================================================
// SnapshotConfig
// =============================================================================

/// Configuration for the file snapshot backend.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Directory holding one snapshot file per entity type.
    pub dir: PathBuf,
}

impl SnapshotConfig {
    /// Point the backend at a snapshot directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

// =============================================================================
// SnapshotStorage
// =============================================================================

#[derive(Clone)]
struct Inner<E> {
    /// Entities keyed by the primary key's canonical text
    map: HashMap<String, E>,
    /// Insertion order of keys; scan and snapshot order
    order: Vec<String>,
}

impl<E: Entity> Inner<E> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn put(&mut self, key: String, entity: E) {
        if self.map.insert(key.clone(), entity).is_none() {
            self.order.push(key);
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.map.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

/// Storage backend over one JSON snapshot file.
pub struct SnapshotStorage<E: Entity> {
    path: PathBuf,
    meta: &'static EntityMeta,
    inner: RwLock<Inner<E>>,
}

impl<E: Entity> std::fmt::Debug for SnapshotStorage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStorage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> SnapshotStorage<E> {
    /// Create a backend for the entity type; the file name comes from its
    /// metadata. No I/O happens until [`init`](Storage::init).
    #[must_use]
    pub fn new(config: &SnapshotConfig) -> Self {
        let meta = EntityMeta::of::<E>();
        Self {
            path: config.dir.join(meta.file_name()),
            meta,
            inner: RwLock::new(Inner::new()),
        }
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode_entity(&self, entity: &E) -> Json {
        let mut doc = serde_json::Map::new();
        for field in self.meta.persisted_fields() {
            doc.insert(field.name.to_string(), to_json(&entity.get(field.name)));
        }
        Json::Object(doc)
    }

    fn decode_entity(&self, raw: &Json) -> StorageResult<E> {
        let mut entity = E::default();
        for field in self.meta.persisted_fields() {
            let Some(value) = raw.get(field.name) else {
                continue;
            };
            entity.set(field.name, from_json(field.kind, value)?)?;
        }
        Ok(entity)
    }

    /// Resolve the entity's key, generating an identifier when the key
    /// field is an unset identifier.
    fn resolve_key(&self, entity: &mut E) -> StorageResult<Value> {
        let key = primary_key_of(entity);
        if !key.is_null() {
            return Ok(key);
        }
        if self.meta.primary_key().kind == FieldKind::Id {
            let fresh = Value::Id(ids::random());
            set_primary_key(entity, fresh.clone())?;
            return Ok(fresh);
        }
        Err(StorageError::missing_key(self.meta.type_name()))
    }

    async fn load(&self) -> StorageResult<()> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::io(format!("failed to read snapshot: {e}")))?;
        if raw.trim().is_empty() {
            return Ok(());
        }
        let root: Json = serde_json::from_str(&raw)
            .map_err(|e| StorageError::io(format!("malformed snapshot file: {e}")))?;
        let Some(data) = root.get("data").and_then(Json::as_array) else {
            return Err(StorageError::io("snapshot file has no data list"));
        };

        let mut inner = self.inner.write().await;
        inner.map.clear();
        inner.order.clear();
        for raw_entity in data {
            let entity = self.decode_entity(raw_entity)?;
            let key = primary_key_of(&entity);
            if key.is_null() {
                return Err(StorageError::missing_key(self.meta.type_name()));
            }
            inner.put(key.key_string(), entity);
        }
        debug!(count = inner.map.len(), path = %self.path.display(), "snapshot loaded");
        Ok(())
    }

    /// Write the entire map as a temporary sibling, then rename over the
    /// target path.
    async fn persist(&self, inner: &Inner<E>) -> StorageResult<()> {
        let entities: Vec<Json> = inner
            .order
            .iter()
            .filter_map(|key| inner.map.get(key))
            .map(|entity| self.encode_entity(entity))
            .collect();
        let snapshot = serde_json::json!({ "data": entities });
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StorageError::io(format!("failed to serialize snapshot: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StorageError::io(format!("failed to write snapshot: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::io(format!("failed to replace snapshot: {e}")))?;
        Ok(())
    }

    /// Upsert one entity into the in-memory map without persisting.
    async fn fill(&self, entity: &mut E) -> StorageResult<()> {
        let key = self.resolve_key(entity)?.key_string();
        let mut inner = self.inner.write().await;
        if inner.map.contains_key(&key) {
            entity.mark_updated();
        } else {
            entity.mark_created();
        }
        inner.put(key, entity.clone());
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Storage<E> for SnapshotStorage<E> {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn init(&self) -> StorageResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(format!("failed to create snapshot dir: {e}")))?;
        }
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| StorageError::io(format!("failed to stat snapshot: {e}")))?
        {
            self.load().await
        } else {
            let inner = self.inner.read().await;
            self.persist(&inner).await
        }
    }

    async fn insert(&self, entity: &mut E) -> StorageResult<()> {
        let key = self.resolve_key(entity)?;
        let key_string = key.key_string();

        let mut inner = self.inner.write().await;
        if inner.map.contains_key(&key_string) {
            return Err(StorageError::duplicate_key(self.meta.type_name(), key_string));
        }
        entity.mark_created();
        inner.put(key_string, entity.clone());
        self.persist(&inner).await
    }

    async fn update(&self, entity: &mut E) -> StorageResult<()> {
        let key = primary_key_of(entity);
        if key.is_null() {
            return Err(StorageError::missing_key(self.meta.type_name()));
        }
        let key_string = key.key_string();

        let mut inner = self.inner.write().await;
        if !inner.map.contains_key(&key_string) {
            return Err(StorageError::not_found(self.meta.type_name(), key_string));
        }
        entity.mark_updated();
        inner.put(key_string, entity.clone());
        self.persist(&inner).await
    }

    async fn find_by_id(&self, id: &Value) -> StorageResult<Option<E>> {
        let inner = self.inner.read().await;
        Ok(inner.map.get(&id.key_string()).cloned())
    }

    async fn find_all(&self, limit: Option<u64>, offset: u64) -> StorageResult<Vec<E>> {
        let inner = self.inner.read().await;
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(inner
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|key| inner.map.get(key))
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &Value) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.remove(&id.key_string()) {
            self.persist(&inner).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn count(&self) -> StorageResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.map.len() as u64)
    }

    async fn exists_by_id(&self, id: &Value) -> StorageResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.map.contains_key(&id.key_string()))
    }

    /// Fill the map for the whole batch through the bounded worker path,
    /// then persist exactly once, regardless of batch size.
    async fn save_all(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        let results: Vec<StorageResult<E>> = stream::iter(entities.into_iter().map(
            |mut entity| async move {
                self.fill(&mut entity).await?;
                Ok(entity)
            },
        ))
        .buffer_unordered(save_all_workers())
        .collect()
        .await;

        let outcome = collect_batch(results);
        let inner = self.inner.write().await;
        self.persist(&inner).await?;
        outcome
    }

    /// Apply the batch in input order against a staged copy of the map;
    /// swap and persist only when every entity applied.
    async fn save_all_atomic(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        let mut inner = self.inner.write().await;
        let mut staged = inner.clone();
        let mut out = Vec::with_capacity(entities.len());

        for mut entity in entities {
            let key = self.resolve_key(&mut entity)?.key_string();
            if staged.map.contains_key(&key) {
                entity.mark_updated();
            } else {
                entity.mark_created();
            }
            staged.put(key, entity.clone());
            out.push(entity);
        }

        *inner = staged;
        self.persist(&inner).await?;
        Ok(out)
    }
}
