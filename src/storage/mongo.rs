//! Document backend
//!
//! Implements the storage contract over a MongoDB collection. Index
//! reconciliation at `init()` compares declared definitions against the
//! live catalog by name, key set, and uniqueness: matching indexes stay, a
//! same-named index with a different shape is dropped and recreated, absent
//! ones are created.
//!
//! Document mapping applies the BSON codec per declared field kind and
//! remaps the primary key to the store's conventional `_id` unless an
//! explicit external name was declared. Identifier keys left unset are
//! assigned a fresh random value before insert.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, IndexModel};
use tracing::{debug, info};

use super::backend::Storage;
use super::error::{StorageError, StorageResult};
use crate::codec::bson::{from_bson, to_bson};
use crate::entity::{primary_key_of, set_primary_key, Entity};
use crate::ids;
use crate::meta::EntityMeta;
use crate::value::{FieldKind, Value};

// =============================================================================
// MongoConfig
// =============================================================================

/// Configuration for the document backend.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string
    pub uri: String,
    /// Database name
    pub database: String,
    /// Run singular writes inside a session-scoped transaction.
    ///
    /// Default: false (lower latency)
    pub transactional: bool,
}

impl MongoConfig {
    /// Configure from a connection string and database name.
    #[must_use]
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            transactional: false,
        }
    }

    /// Wrap singular writes in transactions (requires a replica set).
    #[must_use]
    pub fn with_transactions(mut self) -> Self {
        self.transactional = true;
        self
    }
}

// =============================================================================
// Document Mapping
// =============================================================================

fn document_field_name(meta: &EntityMeta, field: &crate::meta::FieldSpec) -> String {
    if field.primary_key {
        meta.primary_key_document_name().to_string()
    } else {
        field.name.to_string()
    }
}

pub(crate) fn entity_to_document<E: Entity>(meta: &EntityMeta, entity: &E) -> Document {
    let mut doc = Document::new();
    for field in meta.persisted_fields() {
        doc.insert(
            document_field_name(meta, field),
            to_bson(&entity.get(field.name)),
        );
    }
    doc
}

pub(crate) fn entity_from_document<E: Entity>(
    meta: &EntityMeta,
    doc: &Document,
) -> StorageResult<E> {
    let mut entity = E::default();
    for field in meta.persisted_fields() {
        let Some(raw) = doc.get(document_field_name(meta, field)) else {
            continue;
        };
        entity.set(field.name, from_bson(field.kind, raw)?)?;
    }
    Ok(entity)
}

// =============================================================================
// MongoStorage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct LiveIndex {
    keys: Vec<String>,
    unique: bool,
}

/// Document storage backend for one entity type.
pub struct MongoStorage<E: Entity> {
    client: Client,
    collection: Collection<Document>,
    transactional: bool,
    meta: &'static EntityMeta,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> std::fmt::Debug for MongoStorage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStorage")
            .field("collection", &self.meta.collection_name())
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> MongoStorage<E> {
    /// Connect a client and bind the entity type's collection.
    ///
    /// # Errors
    /// `Io` when the client cannot be created.
    pub async fn connect(config: &MongoConfig) -> StorageResult<Self> {
        assert!(!config.uri.is_empty(), "connection uri cannot be empty");
        assert!(!config.database.is_empty(), "database name cannot be empty");

        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| StorageError::io(format!("failed to connect: {e}")))?;
        let meta = EntityMeta::of::<E>();
        let collection = client
            .database(&config.database)
            .collection::<Document>(meta.collection_name());

        Ok(Self {
            client,
            collection,
            transactional: config.transactional,
            meta,
            _entity: PhantomData,
        })
    }

    fn key_filter(&self, key: &Value) -> Document {
        let mut filter = Document::new();
        filter.insert(self.meta.primary_key_document_name(), to_bson(key));
        filter
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

    async fn live_indexes(&self) -> StorageResult<HashMap<String, LiveIndex>> {
        let mut cursor = match self.collection.list_indexes().await {
            Ok(cursor) => cursor,
            // a collection that does not exist yet has no indexes
            Err(e) if namespace_missing(&e) => return Ok(HashMap::new()),
            Err(e) => return Err(StorageError::io(format!("failed to list indexes: {e}"))),
        };

        let mut out = HashMap::new();
        while let Some(model) = cursor
            .try_next()
            .await
            .map_err(|e| StorageError::io(format!("failed to read index catalog: {e}")))?
        {
            let Some(name) = model.options.as_ref().and_then(|o| o.name.clone()) else {
                continue;
            };
            let unique = model
                .options
                .as_ref()
                .and_then(|o| o.unique)
                .unwrap_or(false);
            let keys = model.keys.keys().cloned().collect();
            out.insert(name, LiveIndex { keys, unique });
        }
        Ok(out)
    }

    async fn create_index(&self, def: &crate::meta::IndexDef) -> StorageResult<()> {
        let mut keys = Document::new();
        for column in &def.columns {
            keys.insert(column.clone(), Bson::Int32(1));
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(Some(def.name.clone()))
                    .unique(Some(def.unique))
                    .build(),
            )
            .build();
        self.collection
            .create_index(model)
            .await
            .map_err(|e| StorageError::io(format!("failed to create index {}: {e}", def.name)))?;
        Ok(())
    }

    async fn save_batch_with_session(
        &self,
        session: &mut ClientSession,
        entities: Vec<E>,
    ) -> StorageResult<Vec<E>> {
        let mut out = Vec::with_capacity(entities.len());
        for mut entity in entities {
            let key = self.resolve_key(&mut entity)?;
            let filter = self.key_filter(&key);
            let exists = self
                .collection
                .find_one(filter.clone())
                .session(&mut *session)
                .await
                .map_err(|e| StorageError::io(format!("failed to probe key: {e}")))?
                .is_some();
            if exists {
                entity.mark_updated();
                self.collection
                    .replace_one(filter, entity_to_document(self.meta, &entity))
                    .session(&mut *session)
                    .await
                    .map_err(|e| StorageError::io(format!("batch save failed: {e}")))?;
            } else {
                entity.mark_created();
                self.collection
                    .insert_one(entity_to_document(self.meta, &entity))
                    .session(&mut *session)
                    .await
                    .map_err(|e| StorageError::io(format!("batch save failed: {e}")))?;
            }
            out.push(entity);
        }
        Ok(out)
    }
}

fn namespace_missing(e: &mongodb::error::Error) -> bool {
    matches!(&*e.kind, ErrorKind::Command(command) if command.code == 26)
}

// =============================================================================
// Storage Implementation
// =============================================================================

#[async_trait]
impl<E: Entity> Storage<E> for MongoStorage<E> {
    #[tracing::instrument(skip(self), fields(collection = self.meta.collection_name()))]
    async fn init(&self) -> StorageResult<()> {
        let existing = self.live_indexes().await?;
        for def in self.meta.indexes() {
            match existing.get(&def.name) {
                Some(live) if live.keys == def.columns && live.unique == def.unique => {
                    debug!(index = %def.name, "index up to date");
                }
                Some(_) => {
                    info!(index = %def.name, "index shape changed, recreating");
                    self.collection.drop_index(&def.name).await.map_err(|e| {
                        StorageError::io(format!("failed to drop index {}: {e}", def.name))
                    })?;
                    self.create_index(def).await?;
                }
                None => {
                    info!(index = %def.name, "creating index");
                    self.create_index(def).await?;
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }

    async fn insert(&self, entity: &mut E) -> StorageResult<()> {
        let key = self.resolve_key(entity)?;
        if self.exists_by_id(&key).await? {
            return Err(StorageError::duplicate_key(
                self.meta.type_name(),
                key.key_string(),
            ));
        }
        entity.mark_created();
        let doc = entity_to_document(self.meta, entity);

        if self.transactional {
            let mut session = start_transaction(&self.client).await?;
            match self.collection.insert_one(doc).session(&mut session).await {
                Ok(_) => commit(session).await,
                Err(e) => abort(session, e).await,
            }
        } else {
            self.collection
                .insert_one(doc)
                .await
                .map_err(|e| StorageError::io(format!("failed to insert: {e}")))?;
            Ok(())
        }
    }

    async fn update(&self, entity: &mut E) -> StorageResult<()> {
        let key = primary_key_of(entity);
        if key.is_null() {
            return Err(StorageError::missing_key(self.meta.type_name()));
        }
        if !self.exists_by_id(&key).await? {
            return Err(StorageError::not_found(
                self.meta.type_name(),
                key.key_string(),
            ));
        }
        entity.mark_updated();
        let filter = self.key_filter(&key);
        let doc = entity_to_document(self.meta, entity);

        if self.transactional {
            let mut session = start_transaction(&self.client).await?;
            match self
                .collection
                .replace_one(filter, doc)
                .session(&mut session)
                .await
            {
                Ok(_) => commit(session).await,
                Err(e) => abort(session, e).await,
            }
        } else {
            self.collection
                .replace_one(filter, doc)
                .await
                .map_err(|e| StorageError::io(format!("failed to update: {e}")))?;
            Ok(())
        }
    }

    async fn find_by_id(&self, id: &Value) -> StorageResult<Option<E>> {
        let found = self
            .collection
            .find_one(self.key_filter(id))
            .await
            .map_err(|e| StorageError::io(format!("query failed: {e}")))?;
        found
            .map(|doc| entity_from_document(self.meta, &doc))
            .transpose()
    }

    async fn find_all(&self, limit: Option<u64>, offset: u64) -> StorageResult<Vec<E>> {
        let mut find = self.collection.find(Document::new());
        if offset > 0 {
            find = find.skip(offset);
        }
        if let Some(limit) = limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let mut cursor = find
            .await
            .map_err(|e| StorageError::io(format!("query failed: {e}")))?;

        let mut out = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| StorageError::io(format!("query failed: {e}")))?
        {
            out.push(entity_from_document(self.meta, &doc)?);
        }
        Ok(out)
    }

    async fn delete_by_id(&self, id: &Value) -> StorageResult<bool> {
        let result = self
            .collection
            .delete_one(self.key_filter(id))
            .await
            .map_err(|e| StorageError::io(format!("failed to delete: {e}")))?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> StorageResult<u64> {
        self.collection
            .count_documents(Document::new())
            .await
            .map_err(|e| StorageError::io(format!("failed to count: {e}")))
    }

    async fn exists_by_id(&self, id: &Value) -> StorageResult<bool> {
        let found = self
            .collection
            .find_one(self.key_filter(id))
            .await
            .map_err(|e| StorageError::io(format!("failed to probe key: {e}")))?;
        Ok(found.is_some())
    }

    /// Sequential batch upsert inside one session-scoped transaction,
    /// regardless of the `transactional` flag; atomicity is this
    /// operation's contract. Requires a replica-set deployment.
    async fn save_all_atomic(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        let mut session = start_transaction(&self.client).await?;
        match self.save_batch_with_session(&mut session, entities).await {
            Ok(out) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| StorageError::io(format!("failed to commit batch: {e}")))?;
                Ok(out)
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn start_transaction(client: &Client) -> StorageResult<ClientSession> {
    let mut session = client
        .start_session()
        .await
        .map_err(|e| StorageError::io(format!("failed to start session: {e}")))?;
    session
        .start_transaction()
        .await
        .map_err(|e| StorageError::io(format!("failed to start transaction: {e}")))?;
    Ok(session)
}

async fn commit(mut session: ClientSession) -> StorageResult<()> {
    session
        .commit_transaction()
        .await
        .map_err(|e| StorageError::io(format!("failed to commit: {e}")))
}

async fn abort(mut session: ClientSession, cause: mongodb::error::Error) -> StorageResult<()> {
    let _ = session.abort_transaction().await;
    Err(StorageError::io(format!("write failed: {cause}")))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{EntitySpec, FieldSpec};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Profile {
        id: Option<uuid::Uuid>,
        alias: String,
        logins: i64,
    }

    impl Entity for Profile {
        fn spec() -> &'static EntitySpec {
            static SPEC: EntitySpec = EntitySpec::new(
                "Profile",
                &[
                    FieldSpec::new("id", FieldKind::Id).primary_key(),
                    FieldSpec::new("alias", FieldKind::Text),
                    FieldSpec::new("logins", FieldKind::BigInt),
                ],
            );
            &SPEC
        }

        fn get(&self, field: &str) -> Value {
            match field {
                "id" => self.id.into(),
                "alias" => Value::Text(self.alias.clone()),
                "logins" => Value::BigInt(self.logins),
                _ => Value::Null,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
            match (field, value) {
                ("id", Value::Id(v)) => self.id = Some(v),
                ("id", Value::Null) => self.id = None,
                ("alias", Value::Text(v)) => self.alias = v,
                ("logins", Value::BigInt(v)) => self.logins = v,
                (_, Value::Null) => {}
                (f, v) => return Err(StorageError::assembly(format!("{f}: {v:?}"))),
            }
            Ok(())
        }
    }

    #[test]
    fn test_primary_key_maps_to_document_id() {
        let meta = EntityMeta::of::<Profile>();
        let profile = Profile {
            id: Some(crate::ids::random()),
            alias: "arwen".into(),
            logins: 3,
        };
        let doc = entity_to_document(meta, &profile);

        assert!(doc.contains_key("_id"));
        assert!(!doc.contains_key("id"));
        assert_eq!(doc.get_str("_id").unwrap(), profile.id.unwrap().to_string());
        assert_eq!(doc.get_str("alias").unwrap(), "arwen");
        assert_eq!(doc.get_i64("logins").unwrap(), 3);
    }

    #[test]
    fn test_document_round_trip() {
        let meta = EntityMeta::of::<Profile>();
        let profile = Profile {
            id: Some(crate::ids::random()),
            alias: "boromir".into(),
            logins: 40,
        };
        let doc = entity_to_document(meta, &profile);
        let back: Profile = entity_from_document(meta, &doc).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_missing_document_fields_stay_blank() {
        let meta = EntityMeta::of::<Profile>();
        let mut doc = Document::new();
        doc.insert("alias", "gimli");
        let back: Profile = entity_from_document(meta, &doc).unwrap();
        assert_eq!(back.alias, "gimli");
        assert_eq!(back.id, None);
        assert_eq!(back.logins, 0);
    }
}
