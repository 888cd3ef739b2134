//! Error types for the synchronization engine.

use devicesync_edge::EdgeError;
use devicesync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconciling or syncing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Edge platform error.
    #[error("edge error: {0}")]
    Edge(#[from] EdgeError),

    /// Some desired property values could not be applied.
    #[error("failed to reconcile properties: {}", failed.join(", "))]
    PropertyReconcile {
        /// Names of the properties that failed.
        failed: Vec<String>,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns true for a stale-version write, which is retried without noise.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_conflict())
    }

    /// Returns true if the edge platform could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, EngineError::Edge(e) if e.is_unreachable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::{Kind, ObjectKey};

    #[test]
    fn conflict_classification() {
        let err: EngineError = StoreError::Conflict {
            kind: Kind::Device,
            key: ObjectKey::new("default", "lamp"),
            expected: "1".into(),
            actual: "2".into(),
        }
        .into();
        assert!(err.is_conflict());
        assert!(!err.is_unreachable());

        let err: EngineError = EdgeError::Unreachable("refused".into()).into();
        assert!(err.is_unreachable());
        assert!(!err.is_conflict());
    }

    #[test]
    fn property_error_lists_names() {
        let err = EngineError::PropertyReconcile {
            failed: vec!["brightness".into(), "color".into()],
        };
        assert_eq!(
            err.to_string(),
            "failed to reconcile properties: brightness, color"
        );
    }
}
