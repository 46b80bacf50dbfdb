//! Shared entity fixtures for integration tests.
#![allow(dead_code)] // each test binary uses a subset

use polystore::meta::{EntitySpec, FieldSpec, IndexSpec};
use polystore::storage::StorageResult;
use polystore::{Entity, FieldKind, Stamps, StorageError, Value};

// =============================================================================
// Rank
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rank {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl Rank {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "BRONZE" => Some(Self::Bronze),
            "SILVER" => Some(Self::Silver),
            "GOLD" => Some(Self::Gold),
            _ => None,
        }
    }
}

// =============================================================================
// Player
// =============================================================================

/// The canonical fixture: identifier key, unique name, enum rank, stamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Player {
    pub id: Option<uuid::Uuid>,
    pub name: String,
    pub rank: Rank,
    pub score: i64,
    pub stamps: Stamps,
}

impl Player {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Player {
    fn spec() -> &'static EntitySpec {
        static SPEC: EntitySpec = EntitySpec::new(
            "Player",
            &[
                FieldSpec::new("id", FieldKind::Id).primary_key(),
                FieldSpec::new("name", FieldKind::Text).required().unique(),
                FieldSpec::new("rank", FieldKind::Enum),
                FieldSpec::new("score", FieldKind::BigInt),
                FieldSpec::new("created_at", FieldKind::Instant),
                FieldSpec::new("updated_at", FieldKind::Instant),
            ],
        )
        .indexes(&[IndexSpec::new(&["rank", "score"])]);
        &SPEC
    }

    fn get(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "name" => Value::Text(self.name.clone()),
            "rank" => Value::Enum(self.rank.as_str().to_string()),
            "score" => Value::BigInt(self.score),
            "created_at" => self.stamps.created_at.into(),
            "updated_at" => self.stamps.updated_at.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
        match (field, value) {
            ("id", Value::Id(v)) => self.id = Some(v),
            ("id", Value::Null) => self.id = None,
            ("name", Value::Text(v)) => self.name = v,
            ("rank", Value::Enum(v)) => {
                self.rank = Rank::from_str(&v)
                    .ok_or_else(|| StorageError::assembly(format!("unknown rank {v:?}")))?;
            }
            ("score", Value::BigInt(v)) => self.score = v,
            ("created_at", Value::Instant(v)) => self.stamps.created_at = Some(v),
            ("updated_at", Value::Instant(v)) => self.stamps.updated_at = Some(v),
            (_, Value::Null) => {}
            (f, v) => return Err(StorageError::assembly(format!("Player has no {f} = {v:?}"))),
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

// =============================================================================
// Counter
// =============================================================================

/// A fixture with a caller-assigned text key: nothing is auto-generated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counter {
    pub slug: Option<String>,
    pub value: i64,
}

impl Counter {
    pub fn at(slug: &str, value: i64) -> Self {
        Self {
            slug: Some(slug.to_string()),
            value,
        }
    }
}

impl Entity for Counter {
    fn spec() -> &'static EntitySpec {
        static SPEC: EntitySpec = EntitySpec::new(
            "Counter",
            &[
                FieldSpec::new("slug", FieldKind::Text).primary_key().plain_document_name(),
                FieldSpec::new("value", FieldKind::BigInt),
            ],
        )
        .file("counters");
        &SPEC
    }

    fn get(&self, field: &str) -> Value {
        match field {
            "slug" => self.slug.clone().into(),
            "value" => Value::BigInt(self.value),
            _ => Value::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> StorageResult<()> {
        match (field, value) {
            ("slug", Value::Text(v)) => self.slug = Some(v),
            ("slug", Value::Null) => self.slug = None,
            ("value", Value::BigInt(v)) => self.value = v,
            (_, Value::Null) => {}
            (f, v) => return Err(StorageError::assembly(format!("Counter has no {f} = {v:?}"))),
        }
        Ok(())
    }
}
