//! Storage errors
//!
//! The full failure taxonomy of the persistence layer. Every backend raises
//! exactly these, never a silent no-op; batch operations surface at least
//! one failure if any unit failed. No operation retries; retry policy is
//! the caller's responsibility.

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Primary key required but unset
    #[error("{entity}: primary key must be set")]
    MissingKey {
        /// Entity type name
        entity: String,
    },

    /// Insert collides with an existing primary key
    #[error("{entity}: duplicate primary key {key}")]
    DuplicateKey {
        /// Entity type name
        entity: String,
        /// Colliding key, canonical form
        key: String,
    },

    /// Update target absent (delete treats absence as a normal `false`)
    #[error("{entity}: no entity with primary key {key}")]
    NotFound {
        /// Entity type name
        entity: String,
        /// Missing key, canonical form
        key: String,
    },

    /// Connection, disk, or network fault
    #[error("io failure: {message}")]
    Io {
        /// Underlying fault description
        message: String,
    },

    /// Live schema does not match the entity metadata; fatal at `init`
    #[error("schema mismatch: {message}")]
    Schema {
        /// Mismatch description
        message: String,
    },

    /// Connection URL names a database product this layer does not support;
    /// fatal at `init`
    #[error("unsupported dialect: {product}")]
    UnsupportedDialect {
        /// Reported product/scheme
        product: String,
    },

    /// Unable to construct a blank instance or bind a field: a
    /// metadata/type mismatch, never retried
    #[error("assembly failure: {message}")]
    Assembly {
        /// Binding failure description
        message: String,
    },
}

impl StorageError {
    /// Create a missing-key error.
    #[must_use]
    pub fn missing_key(entity: impl Into<String>) -> Self {
        Self::MissingKey {
            entity: entity.into(),
        }
    }

    /// Create a duplicate-key error.
    #[must_use]
    pub fn duplicate_key(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create an io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a schema-mismatch error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create an unsupported-dialect error.
    #[must_use]
    pub fn unsupported_dialect(product: impl Into<String>) -> Self {
        Self::UnsupportedDialect {
            product: product.into(),
        }
    }

    /// Create an assembly error.
    #[must_use]
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    /// Whether this failure is fatal for the backend instance (raised during
    /// `init`, the instance is unusable).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Schema { .. } | Self::UnsupportedDialect { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = StorageError::duplicate_key("Player", "42");
        assert!(matches!(
            err,
            StorageError::DuplicateKey { entity, key } if entity == "Player" && key == "42"
        ));

        let err = StorageError::missing_key("Player");
        assert!(matches!(err, StorageError::MissingKey { entity } if entity == "Player"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(StorageError::schema("drift").is_fatal());
        assert!(StorageError::unsupported_dialect("oracle").is_fatal());

        assert!(!StorageError::io("socket closed").is_fatal());
        assert!(!StorageError::not_found("Player", "42").is_fatal());
        assert!(!StorageError::assembly("bad kind").is_fatal());
    }

    #[test]
    fn test_display_names_entity_and_key() {
        let err = StorageError::not_found("Player", "42");
        assert_eq!(err.to_string(), "Player: no entity with primary key 42");
    }
}
