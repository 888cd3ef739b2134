//! The reconciler seam the controller drives.

use crate::error::EngineResult;
use async_trait::async_trait;
use devicesync_api::{ObjectKey, Resource};
use std::time::Duration;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Re-queue the key right away.
    pub requeue: bool,
    /// Re-queue the key after this delay.
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Nothing left to do.
    pub fn done() -> Self {
        Self::default()
    }

    /// Run again after `after`.
    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(after),
        }
    }

    /// Run again as soon as a worker is free.
    pub fn requeue_immediate() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }
}

/// Drives one record toward its desired state.
///
/// Implementations must be idempotent: the controller may call
/// `reconcile` for the same key any number of times, though never
/// concurrently.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// The record kind handled.
    type Record: Resource;

    /// Reconciles the record at `key`.
    ///
    /// # Errors
    ///
    /// An error re-queues the key with backoff.
    async fn reconcile(&self, key: &ObjectKey) -> EngineResult<ReconcileResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_constructors() {
        assert!(!ReconcileResult::done().requeue);
        assert_eq!(ReconcileResult::requeue_immediate().requeue_after, None);
        assert_eq!(
            ReconcileResult::requeue(Duration::from_secs(3)).requeue_after,
            Some(Duration::from_secs(3))
        );
    }
}
