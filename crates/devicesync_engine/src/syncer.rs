//! Periodic edge-to-store synchronization.
//!
//! Each round lists one kind on the edge platform and in the local store
//! (restricted to this pool), then:
//!
//! - creates local, unmanaged records for edge objects with no counterpart
//! - deletes synced local records whose edge object disappeared
//! - refreshes observed status on records present on both sides
//!
//! A round never touches spec. Status writes use the record's resource
//! version, so a round racing the reconciler loses cleanly with a conflict
//! and the next round picks the record up again.

use crate::config::SyncerConfig;
use crate::diff::{plan, SyncPlan};
use crate::error::EngineResult;
use crate::refresh::StatusRefresh;
use devicesync_api::{edge_name, local_name, Kind, Resource, EDGE_OBJECT_NAME_LABEL};
use devicesync_edge::{EdgeClient, EdgeListOptions};
use devicesync_store::{ListOptions, RecordStore, NODE_POOL_FIELD};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counters for one sync round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRoundReport {
    /// Kind synced.
    pub kind: Kind,
    /// Local records created from edge objects.
    pub created: usize,
    /// Local records deleted because their edge object is gone.
    pub deleted: usize,
    /// Local records whose status was refreshed.
    pub updated: usize,
    /// Records present on both sides with nothing to write.
    pub unchanged: usize,
    /// Status writes that lost to a concurrent writer.
    pub conflicts: usize,
    /// Local records skipped because another claims the same edge name.
    pub duplicates: usize,
    /// Writes that failed for any other reason.
    pub failed: usize,
    /// Round duration.
    pub elapsed: Duration,
}

impl SyncRoundReport {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            created: 0,
            deleted: 0,
            updated: 0,
            unchanged: 0,
            conflicts: 0,
            duplicates: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns true if the round changed anything locally.
    pub fn has_changes(&self) -> bool {
        self.created + self.deleted + self.updated > 0
    }
}

/// Full-scan syncer for one record kind.
pub struct Syncer<R: Resource> {
    store: Arc<dyn RecordStore<R>>,
    edge: Arc<dyn EdgeClient<R>>,
    refresh: Arc<dyn StatusRefresh<R>>,
    node_pool: String,
    namespace: String,
    config: SyncerConfig,
}

impl<R: Resource> Syncer<R> {
    /// Creates a syncer for `node_pool` records in `namespace`.
    pub fn new(
        store: Arc<dyn RecordStore<R>>,
        edge: Arc<dyn EdgeClient<R>>,
        refresh: Arc<dyn StatusRefresh<R>>,
        node_pool: impl Into<String>,
        namespace: impl Into<String>,
        config: SyncerConfig,
    ) -> Self {
        Self {
            store,
            edge,
            refresh,
            node_pool: node_pool.into(),
            namespace: namespace.into(),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncerConfig {
        &self.config
    }

    /// Runs rounds every interval until `stop` turns true.
    ///
    /// The first round starts immediately. A round in progress when the
    /// stop signal arrives runs to completion.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(kind = %R::KIND, interval = ?self.config.interval, "syncer started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sync_once().await {
                        Ok(report) if report.has_changes() => info!(
                            kind = %R::KIND,
                            created = report.created,
                            deleted = report.deleted,
                            updated = report.updated,
                            conflicts = report.conflicts,
                            elapsed = ?report.elapsed,
                            "sync round complete"
                        ),
                        Ok(report) => debug!(kind = %R::KIND, elapsed = ?report.elapsed, "sync round complete"),
                        Err(e) => warn!(kind = %R::KIND, error = %e, "sync round aborted"),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!(kind = %R::KIND, "syncer stopped");
    }

    /// Runs one round.
    ///
    /// # Errors
    ///
    /// Returns an error if either listing fails. Nothing is written in that
    /// case, so an unreachable edge platform never deletes local records.
    pub async fn sync_once(&self) -> EngineResult<SyncRoundReport> {
        let started = Instant::now();
        let mut report = SyncRoundReport::new(R::KIND);

        let edge = self.edge.list(&EdgeListOptions::all()).await?;
        let options = ListOptions::all()
            .in_namespace(&self.namespace)
            .with_field(NODE_POOL_FIELD, &self.node_pool);
        let local = self.store.list(&options).await?;

        let SyncPlan {
            create,
            delete,
            update,
            duplicates,
            edge_duplicates,
        } = plan(&edge, &local);

        for dup in &duplicates {
            warn!(
                kind = %R::KIND,
                record = %dup.key(),
                edge_name = %edge_name(dup),
                "another record claims this edge name, skipping"
            );
        }
        for dup in &edge_duplicates {
            warn!(kind = %R::KIND, edge_name = %edge_name(dup), "edge name differs only in case, skipping");
        }
        report.duplicates = duplicates.len();

        for remote in create {
            self.create_local(remote, &mut report).await;
        }
        for stale in delete {
            self.delete_local(&stale, &mut report).await;
        }
        for (existing, remote) in update {
            self.refresh_local(existing, &remote, &mut report).await;
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    fn localize(&self, remote: &R) -> R {
        let mut record = remote.clone();
        let name = edge_name(remote).to_string();
        let meta = record.meta_mut();
        meta.name = local_name(&self.node_pool, &name);
        meta.namespace = self.namespace.clone();
        meta.labels.insert(EDGE_OBJECT_NAME_LABEL.to_string(), name);
        meta.resource_version = None;
        meta.uid = None;
        meta.finalizers.clear();
        meta.deletion_timestamp = None;
        record.set_node_pool(&self.node_pool);
        record.set_managed(false);
        record
    }

    async fn create_local(&self, remote: R, report: &mut SyncRoundReport) {
        let record = self.localize(&remote);
        let key = record.key();
        let mut created = match self.store.create(&record).await {
            Ok(created) => created,
            Err(e) if e.is_already_exists() => {
                debug!(kind = %R::KIND, record = %key, "already created locally");
                return;
            }
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "local create failed");
                report.failed += 1;
                return;
            }
        };
        info!(kind = %R::KIND, record = %key, edge_name = %edge_name(&remote), "created from edge");
        report.created += 1;

        *created.status_mut() = remote.status().clone();
        match self.store.update_status(&created).await {
            Ok(_) => {}
            Err(e) if e.is_conflict() => report.conflicts += 1,
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "status write after create failed");
                report.failed += 1;
            }
        }
    }

    async fn delete_local(&self, stale: &R, report: &mut SyncRoundReport) {
        let key = stale.key();
        match self.store.delete(&key).await {
            Ok(()) => {
                info!(kind = %R::KIND, record = %key, "edge object gone, deleting");
                report.deleted += 1;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "local delete failed");
                report.failed += 1;
            }
        }
    }

    async fn refresh_local(&self, existing: R, remote: &R, report: &mut SyncRoundReport) {
        let mut next = existing.clone();
        self.refresh.refresh(&mut next, remote).await;
        if next.status() == existing.status() {
            report.unchanged += 1;
            return;
        }

        match self.store.update_status(&next).await {
            Ok(_) => report.updated += 1,
            Err(e) if e.is_conflict() => {
                debug!(kind = %R::KIND, record = %next.key(), "status refresh conflicted");
                report.conflicts += 1;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(kind = %R::KIND, record = %next.key(), error = %e, "status refresh failed");
                report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::DeviceProfileStatusRefresh;
    use devicesync_api::DeviceProfile;
    use devicesync_edge::{EdgeError, MockEdgeClient, MockOp, Placement};
    use devicesync_store::{node_pool_indexer, InMemoryStore, Scheme};

    fn setup() -> (
        Arc<InMemoryStore<DeviceProfile>>,
        Arc<MockEdgeClient<DeviceProfile>>,
        Syncer<DeviceProfile>,
    ) {
        let store =
            Arc::new(InMemoryStore::<DeviceProfile>::new(&Scheme::with_device_kinds()).unwrap());
        store
            .register_field_index(NODE_POOL_FIELD, node_pool_indexer())
            .unwrap();
        let edge = Arc::new(MockEdgeClient::<DeviceProfile>::new(Placement::new(
            "default", "hangzhou",
        )));
        let syncer = Syncer::<DeviceProfile>::new(
            store.clone(),
            edge.clone(),
            Arc::new(DeviceProfileStatusRefresh),
            "hangzhou",
            "default",
            SyncerConfig::default(),
        );
        (store, edge, syncer)
    }

    #[tokio::test]
    async fn creates_unmanaged_local_records() {
        let (store, edge, syncer) = setup();
        edge.insert("Sensor-Profile", DeviceProfile::new("", "Sensor-Profile"));

        let report = syncer.sync_once().await.unwrap();
        assert_eq!(report.created, 1);

        let key = devicesync_api::ObjectKey::new("default", "hangzhou-sensor-profile");
        let local = store.get(&key).await.unwrap();
        assert!(!local.spec.managed);
        assert_eq!(local.spec.node_pool, "hangzhou");
        assert_eq!(edge_name(&local), "Sensor-Profile");
        assert!(local.status.synced);

        let again = syncer.sync_once().await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_failure_writes_nothing() {
        let (store, edge, syncer) = setup();
        let mut synced = DeviceProfile::new("default", "p");
        synced.spec.node_pool = "hangzhou".into();
        let created = store.create(&synced).await.unwrap();
        let mut with_status = created.clone();
        with_status.status.synced = true;
        store.update_status(&with_status).await.unwrap();

        edge.fail_next(MockOp::List, EdgeError::Unreachable("down".into()));
        assert!(syncer.sync_once().await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stops_on_signal() {
        let (_store, _edge, syncer) = setup();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { syncer.run(rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
