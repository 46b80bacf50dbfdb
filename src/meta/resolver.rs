//! Metadata resolver
//!
//! Derives the storage shape of an entity type from its declared spec and
//! memoizes it for the process lifetime. The registry is explicit,
//! lazily-initialized, append-only state: the set of entity types is fixed
//! at build time, so there is no eviction and no teardown.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use super::index::{self, IndexDef};
use super::spec::{EntitySpec, FieldSpec};
use crate::entity::Entity;

/// External name the document backend uses for a conventional primary key.
pub const DOCUMENT_ID_NAME: &str = "_id";

// =============================================================================
// EntityMeta
// =============================================================================

/// Derived, cached description of an entity type's storage shape.
///
/// Once derived for a type, metadata never changes for the process lifetime.
#[derive(Debug)]
pub struct EntityMeta {
    spec: &'static EntitySpec,
    table: String,
    collection: String,
    file: String,
    primary_key: &'static FieldSpec,
    primary_key_document_name: String,
    persisted: Vec<&'static FieldSpec>,
    indexes: Vec<IndexDef>,
}

static REGISTRY: OnceLock<RwLock<HashMap<TypeId, &'static EntityMeta>>> = OnceLock::new();

impl EntityMeta {
    /// The memoized metadata for an entity type, derived on first use.
    ///
    /// # Panics
    /// Panics when the type declares no primary-key field or more than one:
    /// a programming error in the entity declaration, fatal at first use.
    pub fn of<E: Entity>() -> &'static Self {
        let registry = REGISTRY.get_or_init(|| RwLock::new(HashMap::new()));
        let key = TypeId::of::<E>();
        if let Some(meta) = registry.read().unwrap().get(&key).copied() {
            return meta;
        }
        let mut registry = registry.write().unwrap();
        *registry
            .entry(key)
            .or_insert_with(|| Box::leak(Box::new(Self::derive(E::spec()))))
    }

    fn derive(spec: &'static EntitySpec) -> Self {
        let keys: Vec<&'static FieldSpec> =
            spec.fields.iter().filter(|f| f.primary_key).collect();
        assert!(
            !keys.is_empty(),
            "entity type {} declares no primary-key field",
            spec.type_name
        );
        assert!(
            keys.len() == 1,
            "entity type {} declares {} primary-key fields, expected exactly one",
            spec.type_name,
            keys.len()
        );
        let primary_key = keys[0];

        let default_name = spec.type_name.to_lowercase();
        let table = spec.table.unwrap_or(&default_name).to_string();
        let collection = spec.collection.unwrap_or(&default_name).to_string();
        let file = format!("{}.json", spec.file.unwrap_or(&default_name));

        let primary_key_document_name = match primary_key.key_name {
            Some(explicit) => explicit.to_string(),
            None if primary_key.document_id => DOCUMENT_ID_NAME.to_string(),
            None => primary_key.name.to_string(),
        };

        let persisted: Vec<&'static FieldSpec> =
            spec.fields.iter().filter(|f| !f.transient).collect();
        let indexes = index::resolve(&table, spec);

        Self {
            spec,
            table,
            collection,
            file,
            primary_key,
            primary_key_document_name,
            persisted,
            indexes,
        }
    }

    /// The declared spec this metadata was derived from.
    #[must_use]
    pub fn spec(&self) -> &'static EntitySpec {
        self.spec
    }

    /// Simple type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.spec.type_name
    }

    /// Relational table name: explicit override or lowercase type name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Document collection name: explicit override or lowercase type name.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Snapshot file name: explicit override or lowercase type name, plus
    /// the `.json` suffix.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file
    }

    /// The primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> &'static FieldSpec {
        self.primary_key
    }

    /// External name of the primary key on the document backend: explicit
    /// override, the store's `_id` convention, or the field's own name.
    #[must_use]
    pub fn primary_key_document_name(&self) -> &str {
        &self.primary_key_document_name
    }

    /// All persisted (non-transient) fields, in declaration order.
    #[must_use]
    pub fn persisted_fields(&self) -> &[&'static FieldSpec] {
        &self.persisted
    }

    /// Resolved, deduplicated index definitions.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Look up a persisted field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.persisted.iter().copied().find(|f| f.name == name)
    }
}

/// Resolved index definitions for an entity type.
///
/// Byte-identical and identically ordered across calls.
#[must_use]
pub fn indexes_for<E: Entity>() -> &'static [IndexDef] {
    EntityMeta::of::<E>().indexes()
}

// =============================================================================
// Tests
// =============================================================================
