//! A store wrapper that loses status writes on demand.

use async_trait::async_trait;
use devicesync_api::{ObjectKey, Resource};
use devicesync_store::{ListOptions, RecordStore, StoreError, StoreResult, WatchEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Delegates to an inner store, failing the next N status writes with a
/// conflict as if another writer got there first.
pub struct ConflictingStore<R: Resource> {
    inner: Arc<dyn RecordStore<R>>,
    pending: AtomicUsize,
    injected: AtomicUsize,
}

impl<R: Resource> ConflictingStore<R> {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            inner,
            pending: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` status writes conflict.
    pub fn conflict_next(&self, count: usize) {
        self.pending.store(count, Ordering::SeqCst);
    }

    /// Number of conflicts injected so far.
    pub fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<R: Resource> RecordStore<R> for ConflictingStore<R> {
    async fn get(&self, key: &ObjectKey) -> StoreResult<R> {
        self.inner.get(key).await
    }

    async fn list(&self, options: &ListOptions) -> StoreResult<Vec<R>> {
        self.inner.list(options).await
    }

    async fn create(&self, record: &R) -> StoreResult<R> {
        self.inner.create(record).await
    }

    async fn update(&self, record: &R) -> StoreResult<R> {
        self.inner.update(record).await
    }

    async fn update_status(&self, record: &R) -> StoreResult<R> {
        if self.take_conflict() {
            self.injected.fetch_add(1, Ordering::SeqCst);
            let expected = record.meta().resource_version.clone().unwrap_or_default();
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key: record.key(),
                actual: format!("{expected}+"),
                expected,
            });
        }
        self.inner.update_status(record).await
    }

    async fn patch(&self, key: &ObjectKey, patch: &serde_json::Value) -> StoreResult<R> {
        self.inner.patch(key, patch).await
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent<R>> {
        self.inner.watch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::Device;
    use devicesync_store::{InMemoryStore, Scheme};

    #[tokio::test]
    async fn conflicts_are_one_shot() {
        let inner = Arc::new(InMemoryStore::<Device>::new(&Scheme::with_device_kinds()).unwrap());
        let store = ConflictingStore::new(inner);
        let created = store.create(&Device::new("default", "lamp")).await.unwrap();

        store.conflict_next(1);
        assert!(store.update_status(&created).await.unwrap_err().is_conflict());
        assert!(store.update_status(&created).await.is_ok());
        assert_eq!(store.injected(), 1);
    }
}
