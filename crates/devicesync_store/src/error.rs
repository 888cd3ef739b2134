//! Error types for store operations.

use devicesync_api::{ApiError, Kind, ObjectKey};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist.
    #[error("{kind} {key} not found")]
    NotFound {
        /// Record kind.
        kind: Kind,
        /// Record key.
        key: ObjectKey,
    },

    /// A record with the same key already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists {
        /// Record kind.
        kind: Kind,
        /// Record key.
        key: ObjectKey,
    },

    /// The write carried a stale resource version.
    #[error("conflict writing {kind} {key}: expected version {expected}, stored {actual}")]
    Conflict {
        /// Record kind.
        kind: Kind,
        /// Record key.
        key: ObjectKey,
        /// Version the writer based its change on.
        expected: String,
        /// Version currently stored.
        actual: String,
    },

    /// The record failed validation.
    #[error("invalid record: {0}")]
    Invalid(#[from] ApiError),

    /// A list used a field selector without a registered index.
    #[error("no index registered for field {0}")]
    IndexNotRegistered(String),

    /// An index with the same field name already exists.
    #[error("index for field {0} already registered")]
    IndexExists(String),

    /// The store was opened for a kind missing from the scheme.
    #[error("kind {0} is not registered")]
    KindNotRegistered(Kind),

    /// A record or patch could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true for optimistic-concurrency conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true if the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns true if the record already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let key = ObjectKey::new("default", "lamp");
        let conflict = StoreError::Conflict {
            kind: Kind::Device,
            key: key.clone(),
            expected: "3".into(),
            actual: "4".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());

        let missing = StoreError::NotFound {
            kind: Kind::Device,
            key,
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "Device default/lamp not found");
    }
}
