//! Storage contract
//!
//! The single abstract operation set every backend implements. Callers hold
//! a handle typed by entity type (`Box<dyn Storage<E>>` works; the trait is
//! object-safe) and never a concrete backend type; semantics are identical
//! regardless of which backend is behind the handle.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::error::{StorageError, StorageResult};
use crate::constants::{SAVE_ALL_WORKERS_COUNT_MAX, SAVE_ALL_WORKERS_COUNT_MIN};
use crate::entity::{primary_key_of, Entity};
use crate::meta::EntityMeta;
use crate::value::Value;

// =============================================================================
// Storage
// =============================================================================

/// Abstract storage for one entity type.
///
/// Lifecycle: the host calls [`init`](Storage::init) exactly once per
/// backend instance before any operation and [`close`](Storage::close) once
/// after the last. No operation retries, imposes deadlines, or swallows a
/// failure.
#[async_trait]
pub trait Storage<E: Entity>: Send + Sync {
    /// Build resources: connections, schema, indexes.
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Release connections/clients.
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Insert a new entity.
    ///
    /// # Errors
    /// `MissingKey` when the primary key is unset (backends that
    /// auto-generate identifier keys fill it first), `DuplicateKey` when an
    /// entity with the same key already exists.
    async fn insert(&self, entity: &mut E) -> StorageResult<()>;

    /// Update an existing entity.
    ///
    /// # Errors
    /// `MissingKey` when the primary key is unset, `NotFound` when no
    /// entity shares it.
    async fn update(&self, entity: &mut E) -> StorageResult<()>;

    /// Insert-or-update: probes existence by key, then routes.
    ///
    /// # Errors
    /// `MissingKey` when the primary key is unset.
    async fn upsert(&self, entity: &mut E) -> StorageResult<()> {
        let key = primary_key_of(entity);
        if key.is_null() {
            return Err(StorageError::missing_key(EntityMeta::of::<E>().type_name()));
        }
        if self.exists_by_id(&key).await? {
            self.update(entity).await
        } else {
            self.insert(entity).await
        }
    }

    /// Alias for [`upsert`](Storage::upsert).
    async fn save(&self, entity: &mut E) -> StorageResult<()> {
        self.upsert(entity).await
    }

    /// Zero-or-one lookup by primary key. Absence is not an error.
    async fn find_by_id(&self, id: &Value) -> StorageResult<Option<E>>;

    /// Bounded scan in backend-defined order. `limit: None` is unbounded.
    async fn find_all(&self, limit: Option<u64>, offset: u64) -> StorageResult<Vec<E>>;

    /// Unbounded scan.
    async fn find_all_unbounded(&self) -> StorageResult<Vec<E>> {
        self.find_all(None, 0).await
    }

    /// Delete by primary key; returns whether anything was removed.
    async fn delete_by_id(&self, id: &Value) -> StorageResult<bool>;

    /// Delete a batch of keys; returns how many entities were removed.
    async fn delete_all_by_id(&self, ids: &[Value]) -> StorageResult<u64> {
        let mut removed = 0;
        for id in ids {
            if self.delete_by_id(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Total number of stored entities.
    async fn count(&self) -> StorageResult<u64>;

    /// Whether an entity with this primary key exists.
    async fn exists_by_id(&self, id: &Value) -> StorageResult<bool>;

    /// Batch upsert, run concurrently across a bounded worker pool.
    ///
    /// Every unit is attempted; if any failed, the first recorded failure is
    /// surfaced after the batch completes. No ordering across entities is
    /// guaranteed. For a single atomic commit boundary use
    /// [`save_all_atomic`](Storage::save_all_atomic).
    async fn save_all(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        let results: Vec<StorageResult<E>> = stream::iter(entities.into_iter().map(
            |mut entity| async move {
                self.save(&mut entity).await?;
                Ok(entity)
            },
        ))
        .buffer_unordered(save_all_workers())
        .collect()
        .await;
        collect_batch(results)
    }

    /// Batch upsert applied strictly sequentially, in input order, inside
    /// one atomic boundary; any failure rolls the whole batch back where
    /// the backend supports it.
    async fn save_all_atomic(&self, entities: Vec<E>) -> StorageResult<Vec<E>>;
}

// =============================================================================
// Helpers
// =============================================================================

/// Worker count for the parallel batch path: available parallelism, capped.
pub(crate) fn save_all_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(SAVE_ALL_WORKERS_COUNT_MIN)
        .clamp(SAVE_ALL_WORKERS_COUNT_MIN, SAVE_ALL_WORKERS_COUNT_MAX)
}

/// Fold batch results: all units were attempted; surface the first failure
/// if any unit failed.
pub(crate) fn collect_batch<E>(results: Vec<StorageResult<E>>) -> StorageResult<Vec<E>> {
    let mut out = Vec::with_capacity(results.len());
    let mut first_failure = None;
    for result in results {
        match result {
            Ok(entity) => out.push(entity),
            Err(err) if first_failure.is_none() => first_failure = Some(err),
            Err(_) => {}
        }
    }
    match first_failure {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

/// The set primary keys of a batch, in batch order; unset keys are skipped.
#[must_use]
pub fn keys_of<E: Entity>(entities: &[E]) -> Vec<Value> {
    entities
        .iter()
        .map(primary_key_of)
        .filter(|key| !key.is_null())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
