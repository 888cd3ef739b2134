//! In-memory record store.

use crate::error::{StoreError, StoreResult};
use crate::index::FieldIndexer;
use crate::patch::merge_patch;
use crate::scheme::Scheme;
use crate::store::{ListOptions, RecordStore, WatchEvent};
use async_trait::async_trait;
use chrono::Utc;
use devicesync_api::{ApiError, ObjectKey, Resource};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

const WATCH_CAPACITY: usize = 1024;

/// A version-stamped in-memory record store.
///
/// Suitable for:
/// - Unit and integration tests
/// - Running the engine without an external control plane
///
/// # Thread Safety
///
/// All state sits behind `parking_lot` locks that are never held across an
/// `await`, so the store can be shared freely between tasks.
///
/// # Example
///
/// ```rust
/// use devicesync_api::Device;
/// use devicesync_store::{InMemoryStore, Scheme};
///
/// let store = InMemoryStore::<Device>::new(&Scheme::with_device_kinds()).unwrap();
/// assert!(store.is_empty());
/// ```
pub struct InMemoryStore<R: Resource> {
    records: RwLock<BTreeMap<ObjectKey, R>>,
    indexes: RwLock<HashMap<String, FieldIndexer<R>>>,
    events: broadcast::Sender<WatchEvent<R>>,
    version: AtomicU64,
}

impl<R: Resource> InMemoryStore<R> {
    /// Opens a store for `R`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KindNotRegistered` if the scheme lacks `R::KIND`.
    pub fn new(scheme: &Scheme) -> StoreResult<Self> {
        scheme.ensure_registered(R::KIND)?;
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Ok(Self {
            records: RwLock::new(BTreeMap::new()),
            indexes: RwLock::new(HashMap::new()),
            events,
            version: AtomicU64::new(0),
        })
    }

    /// Registers a field index usable in `ListOptions::field_selector`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexExists` if the field is already indexed.
    pub fn register_field_index(&self, field: &str, indexer: FieldIndexer<R>) -> StoreResult<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(field) {
            return Err(StoreError::IndexExists(field.to_string()));
        }
        indexes.insert(field.to_string(), indexer);
        debug!(kind = %R::KIND, field, "registered field index");
        Ok(())
    }

    /// Returns true if the field is indexed.
    pub fn has_field_index(&self, field: &str) -> bool {
        self.indexes.read().contains_key(field)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn not_found(key: &ObjectKey) -> StoreError {
        StoreError::NotFound {
            kind: R::KIND,
            key: key.clone(),
        }
    }

    fn check_version(stored: &R, incoming: &R) -> StoreResult<()> {
        let Some(expected) = incoming.meta().resource_version.as_deref() else {
            return Ok(());
        };
        let actual = stored.meta().resource_version.as_deref().unwrap_or_default();
        if expected != actual {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key: stored.key(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    fn spec_changed(old: &R, new: &R) -> StoreResult<bool> {
        let old = serde_json::to_value(old)?;
        let new = serde_json::to_value(new)?;
        Ok(old.get("spec") != new.get("spec"))
    }

    /// Carries system-owned metadata from the stored copy and stamps a new version.
    fn stamp(&self, stored: &R, next: &mut R) -> StoreResult<()> {
        let generation = if Self::spec_changed(stored, next)? {
            stored.meta().generation + 1
        } else {
            stored.meta().generation
        };
        let old = stored.meta();
        let meta = next.meta_mut();
        meta.name = old.name.clone();
        meta.namespace = old.namespace.clone();
        meta.uid = old.uid.clone();
        meta.creation_timestamp = old.creation_timestamp;
        meta.deletion_timestamp = old.deletion_timestamp;
        meta.generation = generation;
        meta.resource_version = Some(self.next_version());
        Ok(())
    }

    /// Stores `next`, or removes it once a deleting record has no finalizers left.
    fn commit(&self, records: &mut BTreeMap<ObjectKey, R>, old: R, next: R) -> R {
        let key = next.key();
        if next.meta().is_deleting() && next.meta().finalizers.is_empty() {
            records.remove(&key);
            debug!(kind = %R::KIND, record = %key, "record removed after last finalizer");
            let _ = self.events.send(WatchEvent::Deleted(next.clone()));
        } else {
            records.insert(key, next.clone());
            let _ = self.events.send(WatchEvent::Modified {
                old,
                new: next.clone(),
            });
        }
        next
    }

    fn matches(
        record: &R,
        options: &ListOptions,
        indexes: &HashMap<String, FieldIndexer<R>>,
    ) -> bool {
        if let Some(namespace) = &options.namespace {
            if &record.meta().namespace != namespace {
                return false;
            }
        }
        let labels_match = options
            .label_selector
            .iter()
            .all(|(k, v)| record.meta().labels.get(k) == Some(v));
        let fields_match = options.field_selector.iter().all(|(field, value)| {
            indexes
                .get(field)
                .is_some_and(|indexer| &indexer(record) == value)
        });
        labels_match && fields_match
    }
}

#[async_trait]
impl<R: Resource> RecordStore<R> for InMemoryStore<R> {
    async fn get(&self, key: &ObjectKey) -> StoreResult<R> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Self::not_found(key))
    }

    async fn list(&self, options: &ListOptions) -> StoreResult<Vec<R>> {
        let indexes = self.indexes.read();
        if let Some(field) = options
            .field_selector
            .keys()
            .find(|f| !indexes.contains_key(f.as_str()))
        {
            return Err(StoreError::IndexNotRegistered(field.clone()));
        }
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| Self::matches(r, options, &indexes))
            .cloned()
            .collect())
    }

    async fn create(&self, record: &R) -> StoreResult<R> {
        if record.name().is_empty() {
            return Err(ApiError::InvalidMeta("name is required".into()).into());
        }
        let key = record.key();
        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }

        let mut next = record.clone();
        *next.status_mut() = R::Status::default();
        let meta = next.meta_mut();
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.resource_version = Some(self.next_version());
        meta.generation = 1;
        meta.creation_timestamp = Some(Utc::now());
        meta.deletion_timestamp = None;

        records.insert(key.clone(), next.clone());
        debug!(kind = %R::KIND, record = %key, "record created");
        let _ = self.events.send(WatchEvent::Added(next.clone()));
        Ok(next)
    }

    async fn update(&self, record: &R) -> StoreResult<R> {
        let key = record.key();
        let mut records = self.records.write();
        let stored = records
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(&key))?;
        Self::check_version(&stored, record)?;
        record.validate_update(&stored)?;

        let mut next = record.clone();
        *next.status_mut() = stored.status().clone();
        self.stamp(&stored, &mut next)?;
        Ok(self.commit(&mut records, stored, next))
    }

    async fn update_status(&self, record: &R) -> StoreResult<R> {
        let key = record.key();
        let mut records = self.records.write();
        let stored = records
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(&key))?;
        Self::check_version(&stored, record)?;

        let mut next = stored.clone();
        *next.status_mut() = record.status().clone();
        next.meta_mut().resource_version = Some(self.next_version());
        Ok(self.commit(&mut records, stored, next))
    }

    async fn patch(&self, key: &ObjectKey, patch: &serde_json::Value) -> StoreResult<R> {
        let mut records = self.records.write();
        let stored = records
            .get(key)
            .cloned()
            .ok_or_else(|| Self::not_found(key))?;

        let mut patch = patch.clone();
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("status");
        }
        let mut doc = serde_json::to_value(&stored)?;
        merge_patch(&mut doc, &patch);
        let mut next: R = serde_json::from_value(doc)?;
        next.validate_update(&stored)?;

        *next.status_mut() = stored.status().clone();
        self.stamp(&stored, &mut next)?;
        Ok(self.commit(&mut records, stored, next))
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        let mut records = self.records.write();
        let stored = records
            .get(key)
            .cloned()
            .ok_or_else(|| Self::not_found(key))?;

        if stored.meta().finalizers.is_empty() {
            records.remove(key);
            debug!(kind = %R::KIND, record = %key, "record deleted");
            let _ = self.events.send(WatchEvent::Deleted(stored));
            return Ok(());
        }

        if !stored.meta().is_deleting() {
            let mut next = stored.clone();
            let meta = next.meta_mut();
            meta.deletion_timestamp = Some(Utc::now());
            meta.resource_version = Some(self.next_version());
            debug!(kind = %R::KIND, record = %key, "deletion requested, waiting on finalizers");
            self.commit(&mut records, stored, next);
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent<R>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{node_pool_indexer, NODE_POOL_FIELD};
    use devicesync_api::{Device, DeviceService};
    use serde_json::json;

    fn store() -> InMemoryStore<Device> {
        InMemoryStore::new(&Scheme::with_device_kinds()).unwrap()
    }

    fn device(name: &str, pool: &str) -> Device {
        let mut d = Device::new("default", name);
        d.spec.node_pool = pool.into();
        d
    }

    #[tokio::test]
    async fn unregistered_kind_is_rejected() {
        let scheme = Scheme::new().register(devicesync_api::Kind::Device);
        assert!(matches!(
            InMemoryStore::<DeviceService>::new(&scheme),
            Err(StoreError::KindNotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn create_drops_status_and_rejects_duplicates() {
        let store = store();
        let mut d = device("lamp", "a");
        d.status.synced = true;

        let created = store.create(&d).await.unwrap();
        assert!(!created.status.synced);
        assert!(created.metadata.uid.is_some());
        assert!(created.metadata.resource_version.is_some());

        let err = store.create(&d).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn update_keeps_status_and_checks_version() {
        let store = store();
        let created = store.create(&device("lamp", "a")).await.unwrap();

        let mut with_status = created.clone();
        with_status.status.synced = true;
        let after_status = store.update_status(&with_status).await.unwrap();
        assert!(after_status.status.synced);

        // Stale version from before the status write.
        let mut stale = created.clone();
        stale.spec.description = "stale".into();
        assert!(store.update(&stale).await.unwrap_err().is_conflict());

        let mut fresh = after_status.clone();
        fresh.spec.description = "fresh".into();
        fresh.status.synced = false;
        let updated = store.update(&fresh).await.unwrap();
        assert_eq!(updated.spec.description, "fresh");
        assert!(updated.status.synced);
        assert_eq!(updated.metadata.generation, 2);
    }

    #[tokio::test]
    async fn status_write_does_not_touch_spec() {
        let store = store();
        let created = store.create(&device("lamp", "a")).await.unwrap();

        let mut edit = created.clone();
        edit.spec.description = "ignored".into();
        edit.status.edge_id = Some("e1".into());
        let written = store.update_status(&edit).await.unwrap();
        assert_eq!(written.spec.description, "");
        assert_eq!(written.status.edge_id.as_deref(), Some("e1"));
    }

    #[tokio::test]
    async fn node_pool_cannot_change() {
        let store = store();
        let mut created = store.create(&device("lamp", "a")).await.unwrap();
        created.spec.node_pool = "b".into();
        assert!(matches!(
            store.update(&created).await,
            Err(StoreError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn delete_waits_for_finalizers() {
        let store = store();
        let mut d = device("lamp", "a");
        d.metadata.finalizers.push("guard".into());
        store.create(&d).await.unwrap();
        let key = d.key();

        store.delete(&key).await.unwrap();
        let marked = store.get(&key).await.unwrap();
        assert!(marked.metadata.is_deleting());

        store
            .patch(&key, &json!({"metadata": {"finalizers": []}}))
            .await
            .unwrap();
        assert!(store.get(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn patch_ignores_status() {
        let store = store();
        let d = store.create(&device("lamp", "a")).await.unwrap();
        let patched = store
            .patch(
                &d.key(),
                &json!({"metadata": {"labels": {"x": "y"}}, "status": {"synced": true}}),
            )
            .await
            .unwrap();
        assert_eq!(patched.metadata.labels.get("x").map(String::as_str), Some("y"));
        assert!(!patched.status.synced);
        assert_ne!(patched.metadata.resource_version, d.metadata.resource_version);
    }

    #[tokio::test]
    async fn list_by_indexed_field() {
        let store = store();
        store.create(&device("a1", "a")).await.unwrap();
        store.create(&device("b1", "b")).await.unwrap();

        let options = ListOptions::all().with_field(NODE_POOL_FIELD, "a");
        assert!(matches!(
            store.list(&options).await,
            Err(StoreError::IndexNotRegistered(_))
        ));

        store
            .register_field_index(NODE_POOL_FIELD, node_pool_indexer())
            .unwrap();
        assert!(matches!(
            store.register_field_index(NODE_POOL_FIELD, node_pool_indexer()),
            Err(StoreError::IndexExists(_))
        ));

        let listed = store.list(&options).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name, "a1");
    }

    #[tokio::test]
    async fn watch_reports_changes() {
        let store = store();
        let mut rx = store.watch();
        let created = store.create(&device("lamp", "a")).await.unwrap();
        let mut synced = created.clone();
        synced.status.synced = true;
        store.update_status(&synced).await.unwrap();
        store.delete(&created.key()).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), WatchEvent::Added(_)));
        match rx.recv().await.unwrap() {
            WatchEvent::Modified { old, new } => {
                assert!(!old.status.synced);
                assert!(new.status.synced);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(rx.recv().await.unwrap(), WatchEvent::Deleted(_)));
    }
}
