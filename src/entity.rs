//! Entity - the persistable record contract
//!
//! An entity is a plain mutable record with exactly one primary-key field.
//! The trait exposes its declared spec and dynamic field access keyed by
//! field name; backends never see concrete field types, only [`Value`]s.

use chrono::{DateTime, Utc};

use crate::meta::{EntityMeta, EntitySpec};
use crate::storage::StorageResult;
use crate::value::Value;

// =============================================================================
// Entity
// =============================================================================

/// A record type persistable by every backend.
///
/// `Default` is the required no-argument constructor: the relational and
/// document backends materialize query results by constructing a blank
/// instance and assigning each persisted field.
///
/// `get` returns `Value::Null` for unknown fields; `set` fails with an
/// assembly error on an unknown field or a kind mismatch.
pub trait Entity: Clone + Default + Send + Sync + 'static {
    /// The declared storage metadata for this type.
    fn spec() -> &'static EntitySpec;

    /// Read a field by name.
    fn get(&self, field: &str) -> Value;

    /// Write a field by name.
    ///
    /// # Errors
    /// `Assembly` when the field is unknown or the value kind does not match.
    fn set(&mut self, field: &str, value: Value) -> StorageResult<()>;

    /// Lifecycle hook invoked by backends on first insert.
    fn mark_created(&mut self) {}

    /// Lifecycle hook invoked by backends on every update.
    fn mark_updated(&mut self) {}
}

// =============================================================================
// Stamps
// =============================================================================

/// The optional timestamp pair shared by entities that track creation and
/// mutation times. Embed it and forward the lifecycle hooks:
///
/// ```
/// use polystore::{Entity, Stamps};
/// # use polystore::meta::{EntitySpec, FieldSpec};
/// # use polystore::{FieldKind, Value};
/// # use polystore::storage::StorageResult;
///
/// #[derive(Debug, Clone, Default)]
/// struct Note {
///     id: Option<uuid::Uuid>,
///     body: String,
///     stamps: Stamps,
/// }
///
/// impl Entity for Note {
/// #    fn spec() -> &'static EntitySpec {
/// #        static SPEC: EntitySpec = EntitySpec::new(
/// #            "Note",
/// #            &[
/// #                FieldSpec::new("id", FieldKind::Id).primary_key(),
/// #                FieldSpec::new("body", FieldKind::Text),
/// #                FieldSpec::new("created_at", FieldKind::Instant),
/// #                FieldSpec::new("updated_at", FieldKind::Instant),
/// #            ],
/// #        );
/// #        &SPEC
/// #    }
/// #    fn get(&self, field: &str) -> Value {
/// #        match field {
/// #            "id" => self.id.into(),
/// #            "body" => Value::Text(self.body.clone()),
/// #            "created_at" => self.stamps.created_at.into(),
/// #            "updated_at" => self.stamps.updated_at.into(),
/// #            _ => Value::Null,
/// #        }
/// #    }
/// #    fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
/// #        match (field, value) {
/// #            ("id", Value::Id(v)) => self.id = Some(v),
/// #            ("id", Value::Null) => self.id = None,
/// #            ("body", Value::Text(v)) => self.body = v,
/// #            ("created_at", Value::Instant(v)) => self.stamps.created_at = Some(v),
/// #            ("updated_at", Value::Instant(v)) => self.stamps.updated_at = Some(v),
/// #            (_, Value::Null) => {}
/// #            (f, v) => return Err(polystore::StorageError::assembly(format!("{f}: {v:?}"))),
/// #        }
/// #        Ok(())
/// #    }
///     // ... spec/get/set ...
///     fn mark_created(&mut self) {
///         self.stamps.mark_created();
///     }
///     fn mark_updated(&mut self) {
///         self.stamps.mark_updated();
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stamps {
    /// Set once, on first insert
    pub created_at: Option<DateTime<Utc>>,
    /// Refreshed on every mutation
    pub updated_at: Option<DateTime<Utc>>,
}

impl Stamps {
    /// First-insert hook: sets `created_at` when unset, refreshes
    /// `updated_at` always.
    pub fn mark_created(&mut self) {
        let now = Utc::now();
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    /// Mutation hook: refreshes `updated_at`.
    pub fn mark_updated(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

// =============================================================================
// Identity
// =============================================================================

/// The entity's primary-key value, `Null` when unset.
#[must_use]
pub fn primary_key_of<E: Entity>(entity: &E) -> Value {
    entity.get(EntityMeta::of::<E>().primary_key().name)
}

/// Assign the entity's primary-key field.
///
/// # Errors
/// `Assembly` when the value kind does not match the key field.
pub fn set_primary_key<E: Entity>(entity: &mut E, value: Value) -> StorageResult<()> {
    entity.set(EntityMeta::of::<E>().primary_key().name, value)
}

/// Identity comparison: equal iff both primary keys resolve non-null and
/// are equal. Instances without a resolvable key are never equal.
#[must_use]
pub fn same_identity<E: Entity>(a: &E, b: &E) -> bool {
    let ka = primary_key_of(a);
    let kb = primary_key_of(b);
    !ka.is_null() && !kb.is_null() && ka == kb
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::FieldSpec;
    use crate::value::FieldKind;

    #[derive(Debug, Clone, Default)]
    struct Token {
        id: Option<uuid::Uuid>,
        stamps: Stamps,
    }

    impl Entity for Token {
        fn spec() -> &'static EntitySpec {
            static SPEC: EntitySpec = EntitySpec::new(
                "Token",
                &[
                    FieldSpec::new("id", FieldKind::Id).primary_key(),
                    FieldSpec::new("created_at", FieldKind::Instant),
                    FieldSpec::new("updated_at", FieldKind::Instant),
                ],
            );
            &SPEC
        }

        fn get(&self, field: &str) -> Value {
            match field {
                "id" => self.id.into(),
                "created_at" => self.stamps.created_at.into(),
                "updated_at" => self.stamps.updated_at.into(),
                _ => Value::Null,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
            match (field, value) {
                ("id", Value::Id(v)) => self.id = Some(v),
                ("id", Value::Null) => self.id = None,
                ("created_at", Value::Instant(v)) => self.stamps.created_at = Some(v),
                ("updated_at", Value::Instant(v)) => self.stamps.updated_at = Some(v),
                (_, Value::Null) => {}
                (f, v) => {
                    return Err(crate::storage::StorageError::assembly(format!("{f}: {v:?}")))
                }
            }
            Ok(())
        }

        fn mark_created(&mut self) {
            self.stamps.mark_created();
        }

        fn mark_updated(&mut self) {
            self.stamps.mark_updated();
        }
    }

    #[test]
    fn test_mark_created_sets_both_once() {
        let mut token = Token::default();
        token.mark_created();
        let created = token.stamps.created_at.expect("created set");
        assert!(token.stamps.updated_at.is_some());

        token.mark_created();
        assert_eq!(token.stamps.created_at, Some(created), "created never moves");
    }

    #[test]
    fn test_mark_updated_refreshes_only_updated() {
        let mut token = Token::default();
        token.mark_created();
        let created = token.stamps.created_at;
        token.mark_updated();
        assert_eq!(token.stamps.created_at, created);
        assert!(token.stamps.updated_at >= created);
    }

    #[test]
    fn test_identity_requires_resolvable_keys() {
        let a = Token::default();
        let b = a.clone();
        assert!(!same_identity(&a, &b), "keyless instances are never equal");

        let id = crate::ids::random();
        let mut a = Token::default();
        let mut b = Token::default();
        set_primary_key(&mut a, Value::Id(id)).unwrap();
        set_primary_key(&mut b, Value::Id(id)).unwrap();
        assert!(same_identity(&a, &b));

        set_primary_key(&mut b, Value::Id(crate::ids::random())).unwrap();
        assert!(!same_identity(&a, &b));
    }
}
