//! Declared storage metadata
//!
//! The static declaration surface an entity type carries: storage name
//! overrides, primary-key designation, transient exclusions, and index
//! markers. These are plain const-friendly structs with builder methods so a
//! declaration reads like the annotation block it replaces:
//!
//! ```
//! use polystore::meta::{EntitySpec, FieldSpec, IndexSpec};
//! use polystore::FieldKind;
//!
//! static SPEC: EntitySpec = EntitySpec::new(
//!     "Player",
//!     &[
//!         FieldSpec::new("id", FieldKind::Id).primary_key(),
//!         FieldSpec::new("name", FieldKind::Text).required().unique(),
//!         FieldSpec::new("rank", FieldKind::Enum),
//!         FieldSpec::new("session_token", FieldKind::Text).transient(),
//!     ],
//! )
//! .table("players")
//! .indexes(&[IndexSpec::new(&["name", "rank"])]);
//! ```

use crate::value::FieldKind;

// =============================================================================
// FieldSpec
// =============================================================================

/// Declared metadata for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name; also the external column/document-field name
    pub name: &'static str,
    /// Declared value kind
    pub kind: FieldKind,
    /// Whether this field is the primary key
    pub primary_key: bool,
    /// Explicit external name override for the primary key
    pub key_name: Option<&'static str>,
    /// Whether a primary key maps to the document store's `_id` convention
    pub document_id: bool,
    /// Excluded from persistence
    pub transient: bool,
    /// Maps to NOT NULL on the relational backend
    pub required: bool,
    /// Field-level unique index marker
    pub unique: bool,
    /// Field-level non-unique index marker
    pub indexed: bool,
}

impl FieldSpec {
    /// Declare a field of the given kind. Defaults: persisted, nullable,
    /// not indexed, not the key.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            key_name: None,
            document_id: true,
            transient: false,
            required: false,
            unique: false,
            indexed: false,
        }
    }

    /// Mark as the primary key. A key column is always required.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    /// Override the primary key's external name.
    #[must_use]
    pub const fn key_name(mut self, name: &'static str) -> Self {
        self.key_name = Some(name);
        self
    }

    /// Keep the primary key under its own name on the document backend
    /// instead of the store's `_id` convention.
    #[must_use]
    pub const fn plain_document_name(mut self) -> Self {
        self.document_id = false;
        self
    }

    /// Exclude from persistence.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Require a value (NOT NULL column).
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare a single-column unique index on this field.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declare a single-column index on this field.
    #[must_use]
    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

// =============================================================================
// IndexSpec
// =============================================================================

/// Type-level index declaration over one or more columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    /// Explicit index name; auto-generated when absent
    pub name: Option<&'static str>,
    /// Ordered column list
    pub columns: &'static [&'static str],
    /// Uniqueness
    pub unique: bool,
}

impl IndexSpec {
    /// Declare a non-unique index over the given columns.
    #[must_use]
    pub const fn new(columns: &'static [&'static str]) -> Self {
        Self {
            name: None,
            columns,
            unique: false,
        }
    }

    /// Give the index an explicit name.
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Make the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// =============================================================================
// EntitySpec
// =============================================================================

/// Declared metadata for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySpec {
    /// Simple type name; storage names default to its lowercase form
    pub type_name: &'static str,
    /// Explicit relational table name
    pub table: Option<&'static str>,
    /// Explicit document collection name
    pub collection: Option<&'static str>,
    /// Explicit snapshot file stem (`.json` is appended)
    pub file: Option<&'static str>,
    /// Declared fields, in persistence order
    pub fields: &'static [FieldSpec],
    /// Type-level index declarations
    pub indexes: &'static [IndexSpec],
}

impl EntitySpec {
    /// Declare an entity type with its fields.
    #[must_use]
    pub const fn new(type_name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self {
            type_name,
            table: None,
            collection: None,
            file: None,
            fields,
            indexes: &[],
        }
    }

    /// Override the relational table name.
    #[must_use]
    pub const fn table(mut self, name: &'static str) -> Self {
        self.table = Some(name);
        self
    }

    /// Override the document collection name.
    #[must_use]
    pub const fn collection(mut self, name: &'static str) -> Self {
        self.collection = Some(name);
        self
    }

    /// Override the snapshot file stem.
    #[must_use]
    pub const fn file(mut self, name: &'static str) -> Self {
        self.file = Some(name);
        self
    }

    /// Attach type-level index declarations.
    #[must_use]
    pub const fn indexes(mut self, indexes: &'static [IndexSpec]) -> Self {
        self.indexes = indexes;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builder_flags() {
        const FIELD: FieldSpec = FieldSpec::new("id", FieldKind::Id).primary_key();
        assert!(FIELD.primary_key);
        assert!(FIELD.required);
        assert!(!FIELD.transient);
        assert!(FIELD.document_id);
    }

    #[test]
    fn test_index_builder() {
        const IDX: IndexSpec = IndexSpec::new(&["name", "rank"]).unique().named("uq_custom");
        assert!(IDX.unique);
        assert_eq!(IDX.name, Some("uq_custom"));
        assert_eq!(IDX.columns, &["name", "rank"]);
    }

    #[test]
    fn test_entity_overrides() {
        static SPEC: EntitySpec =
            EntitySpec::new("Player", &[FieldSpec::new("id", FieldKind::Id).primary_key()])
                .table("players");
        assert_eq!(SPEC.table, Some("players"));
        assert_eq!(SPEC.collection, None);
    }
}
