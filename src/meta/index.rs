//! Index definition resolution
//!
//! Collects field-level and type-level index markers into one normalized,
//! deduplicated definition list. Resolution is deterministic: auto-names are
//! derived from the table name and column list, duplicates collapse by
//! `(uniqueness, column list)` with the first-seen name winning, and
//! first-seen order is preserved so re-running reconciliation against a live
//! catalog is idempotent.

use std::collections::HashSet;

use super::spec::{EntitySpec, IndexSpec};

// =============================================================================
// IndexDef
// =============================================================================

/// One resolved index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name, unique per storage name
    pub name: String,
    /// Uniqueness
    pub unique: bool,
    /// Ordered column list
    pub columns: Vec<String>,
}

impl IndexDef {
    /// Dedup key: uniqueness plus the ordered column list.
    fn dedup_key(&self) -> String {
        let tag = if self.unique { "U" } else { "I" };
        format!("{tag}:{}", self.columns.join(","))
    }
}

/// Auto-generated name: `uq_`/`idx_` + storage name + `_` + columns.
fn auto_name(table: &str, unique: bool, columns: &[String]) -> String {
    let prefix = if unique { "uq" } else { "idx" };
    format!("{prefix}_{table}_{}", columns.join("_"))
}

fn normalize(table: &str, name: Option<&str>, unique: bool, columns: Vec<String>) -> IndexDef {
    let name = match name {
        Some(explicit) if !explicit.trim().is_empty() => explicit.to_string(),
        _ => auto_name(table, unique, &columns),
    };
    IndexDef {
        name,
        unique,
        columns,
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve every index declared on the entity spec, deduplicated.
///
/// Field-level markers become single-column definitions (a unique marker
/// always implies a unique index); type-level declarations contribute their
/// full column lists. Declarations without columns are skipped.
#[must_use]
pub(crate) fn resolve(table: &str, spec: &EntitySpec) -> Vec<IndexDef> {
    let mut out: Vec<IndexDef> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |def: IndexDef| {
        if seen.insert(def.dedup_key()) {
            out.push(def);
        }
    };

    for field in spec.fields {
        if field.transient {
            continue;
        }
        if field.unique {
            push(normalize(table, None, true, vec![field.name.to_string()]));
        }
        if field.indexed {
            push(normalize(table, None, false, vec![field.name.to_string()]));
        }
    }

    for index in spec.indexes {
        push(resolve_type_level(table, index));
    }

    out
}

fn resolve_type_level(table: &str, index: &IndexSpec) -> IndexDef {
    let columns = index.columns.iter().map(ToString::to_string).collect();
    normalize(table, index.name, index.unique, columns)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::spec::FieldSpec;
    use crate::value::FieldKind;

    static SPEC: EntitySpec = EntitySpec::new(
        "Player",
        &[
            FieldSpec::new("id", FieldKind::Id).primary_key(),
            FieldSpec::new("name", FieldKind::Text).unique(),
            FieldSpec::new("rank", FieldKind::Enum).indexed(),
            FieldSpec::new("secret", FieldKind::Text).transient().indexed(),
        ],
    )
    .indexes(&[
        IndexSpec::new(&["name", "rank"]),
        // collides with the field-level unique marker on `name`
        IndexSpec::new(&["name"]).unique().named("uq_custom_name"),
    ]);

    #[test]
    fn test_auto_names() {
        let defs = resolve("player", &SPEC);
        assert_eq!(defs[0].name, "uq_player_name");
        assert!(defs[0].unique);
        assert_eq!(defs[1].name, "idx_player_rank");
        assert!(!defs[1].unique);
    }

    #[test]
    fn test_transient_fields_are_skipped() {
        let defs = resolve("player", &SPEC);
        assert!(defs.iter().all(|d| !d.columns.contains(&"secret".to_string())));
    }

    #[test]
    fn test_dedup_keeps_first_seen_name() {
        let defs = resolve("player", &SPEC);
        // the named type-level duplicate of (unique, [name]) collapsed away
        assert!(defs.iter().any(|d| d.name == "uq_player_name"));
        assert!(!defs.iter().any(|d| d.name == "uq_custom_name"));
    }

    #[test]
    fn test_unique_and_plain_do_not_collapse() {
        let defs = resolve("player", &SPEC);
        let on_name: Vec<_> = defs
            .iter()
            .filter(|d| d.columns == vec!["name".to_string()])
            .collect();
        assert_eq!(on_name.len(), 1, "only the unique marker declares [name] alone");
        let multi: Vec<_> = defs
            .iter()
            .filter(|d| d.columns.len() == 2)
            .collect();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].name, "idx_player_name_rank");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let first = resolve("player", &SPEC);
        let second = resolve("player", &SPEC);
        assert_eq!(first, second);
    }
}
