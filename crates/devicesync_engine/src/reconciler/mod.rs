//! Store-to-edge reconciliation.
//!
//! `RecordReconciler` owns the lifecycle every kind shares: pool
//! filtering, the deletion guard, create-or-adopt on the edge platform,
//! and the final status write. What "push desired state" means differs
//! per kind and lives behind `ManagedState`.

mod device;
mod device_profile;
mod device_service;

pub use device::DeviceManagedState;
pub use device_profile::DeviceProfileManagedState;
pub use device_service::DeviceServiceManagedState;

use crate::error::{EngineError, EngineResult};
use crate::reconcile::{ReconcileResult, Reconciler};
use async_trait::async_trait;
use devicesync_api::{
    edge_name, AdminState, ConditionSeverity, ObjectKey, OperatingState, Resource, READY_CONDITION,
};
use devicesync_edge::EdgeClient;
use devicesync_store::RecordStore;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pushes desired state for a record that is synced and managed.
#[async_trait]
pub trait ManagedState<R: Resource>: Send + Sync {
    /// Applies the record's desired state on the edge platform.
    ///
    /// Implementations record the outcome in the kind's managing
    /// condition and update observed status on `record` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the desired state could not be applied.
    async fn apply(&self, record: &mut R) -> EngineResult<()>;
}

/// Records whose admin and operating state are driven from the store.
trait OperableState: Resource {
    fn desired_states(&self) -> (Option<AdminState>, Option<OperatingState>);

    fn observed_states(&self) -> (Option<AdminState>, Option<OperatingState>);

    fn set_desired_states(&mut self, admin: Option<AdminState>, operating: Option<OperatingState>);

    fn set_observed_states(&mut self, admin: Option<AdminState>, operating: Option<OperatingState>);
}

/// Sends only the state fields that differ from what was last observed,
/// then copies what was sent into status.
///
/// A failed update marks the kind's managing condition false.
async fn push_state_delta<R: OperableState>(
    edge: &dyn EdgeClient<R>,
    record: &mut R,
) -> EngineResult<()> {
    let (want_admin, want_operating) = record.desired_states();
    let (seen_admin, seen_operating) = record.observed_states();
    let admin = want_admin.filter(|s| seen_admin != Some(*s));
    let operating = want_operating.filter(|s| seen_operating != Some(*s));
    if admin.is_none() && operating.is_none() {
        return Ok(());
    }

    let mut delta = record.clone();
    delta.set_desired_states(admin, operating);
    debug!(kind = %R::KIND, record = %record.key(), admin = ?admin, operating = ?operating, "pushing state");
    if let Err(e) = edge.update(&delta).await {
        warn!(kind = %R::KIND, record = %record.key(), error = %e, "state update failed");
        record.conditions_mut().mark_false(
            R::KIND.managing_condition(),
            ConditionSeverity::Error,
            "UpdateStateFailed",
            e.to_string(),
        );
        return Err(e.into());
    }
    record.set_observed_states(admin.or(seen_admin), operating.or(seen_operating));
    Ok(())
}

/// Reconciles one record kind against the edge platform.
pub struct RecordReconciler<R: Resource> {
    store: Arc<dyn RecordStore<R>>,
    edge: Arc<dyn EdgeClient<R>>,
    managed: Arc<dyn ManagedState<R>>,
    node_pool: String,
}

impl<R: Resource> RecordReconciler<R> {
    /// Creates a reconciler for records affiliated with `node_pool`.
    pub fn new(
        store: Arc<dyn RecordStore<R>>,
        edge: Arc<dyn EdgeClient<R>>,
        managed: Arc<dyn ManagedState<R>>,
        node_pool: impl Into<String>,
    ) -> Self {
        Self {
            store,
            edge,
            managed,
            node_pool: node_pool.into(),
        }
    }

    /// The pool this reconciler owns.
    pub fn node_pool(&self) -> &str {
        &self.node_pool
    }

    async fn set_finalizers(&self, key: &ObjectKey, finalizers: Vec<String>) -> EngineResult<R> {
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        Ok(self.store.patch(key, &patch).await?)
    }

    async fn ensure_finalizer(&self, record: R) -> EngineResult<R> {
        let finalizer = R::KIND.finalizer();
        if record.meta().has_finalizer(finalizer) {
            return Ok(record);
        }
        let mut finalizers = record.meta().finalizers.clone();
        finalizers.push(finalizer.to_string());
        debug!(kind = %R::KIND, record = %record.key(), "adding finalizer");
        self.set_finalizers(&record.key(), finalizers).await
    }

    async fn reconcile_delete(&self, mut record: R) -> EngineResult<ReconcileResult> {
        let finalizer = R::KIND.finalizer();
        if !record.meta().has_finalizer(finalizer) {
            return Ok(ReconcileResult::done());
        }

        let key = record.key();
        let name = edge_name(&record).to_string();
        match self.edge.delete(&name).await {
            Ok(()) => info!(kind = %R::KIND, record = %key, edge_name = %name, "deleted on edge"),
            Err(e) if e.is_not_found() => {
                debug!(kind = %R::KIND, record = %key, edge_name = %name, "already absent on edge")
            }
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "edge delete failed");
                let conditions = record.conditions_mut();
                conditions.mark_false(
                    R::KIND.synced_condition(),
                    ConditionSeverity::Warning,
                    "DeleteFailed",
                    e.to_string(),
                );
                conditions.set_summary(
                    READY_CONDITION,
                    &[R::KIND.synced_condition(), R::KIND.managing_condition()],
                );
                if let Err(status_err) = self.store.update_status(&record).await {
                    debug!(kind = %R::KIND, record = %key, error = %status_err, "status write after failed delete");
                }
                return Err(e.into());
            }
        }

        let finalizers = record
            .meta()
            .finalizers
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect();
        match self.set_finalizers(&key, finalizers).await {
            Ok(_) => Ok(ReconcileResult::done()),
            Err(EngineError::Store(e)) if e.is_not_found() => Ok(ReconcileResult::done()),
            Err(e) => Err(e),
        }
    }

    fn adopt(record: &mut R, found: &R, name: &str) {
        let id = found.edge_id().unwrap_or(name).to_string();
        record.mark_synced(id);
        record.conditions_mut().mark_true(R::KIND.synced_condition());
    }

    fn mark_sync_failed(record: &mut R, severity: ConditionSeverity, reason: &str, message: String) {
        record.mark_unsynced();
        record
            .conditions_mut()
            .mark_false(R::KIND.synced_condition(), severity, reason, message);
    }

    /// Pairs an unsynced record with an edge object, creating one if needed.
    async fn create_or_adopt(&self, record: &mut R) -> EngineResult<()> {
        let key = record.key();
        let name = edge_name(record).to_string();

        match self.edge.get(&name).await {
            Ok(found) => {
                info!(kind = %R::KIND, record = %key, edge_name = %name, "adopting existing edge object");
                Self::adopt(record, &found, &name);
                return Ok(());
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "edge lookup failed");
                Self::mark_sync_failed(
                    record,
                    ConditionSeverity::Warning,
                    "EdgeUnavailable",
                    e.to_string(),
                );
                return Ok(());
            }
        }

        match self.edge.create(record).await {
            Ok(id) => {
                info!(kind = %R::KIND, record = %key, edge_name = %name, edge_id = %id, "created on edge");
                record.mark_synced(id);
                record.conditions_mut().mark_true(R::KIND.synced_condition());
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(kind = %R::KIND, record = %key, edge_name = %name, "lost create race, adopting");
                match self.edge.get(&name).await {
                    Ok(found) => {
                        Self::adopt(record, &found, &name);
                        Ok(())
                    }
                    Err(e) => {
                        Self::mark_sync_failed(
                            record,
                            ConditionSeverity::Warning,
                            "AdoptFailed",
                            e.to_string(),
                        );
                        Err(e.into())
                    }
                }
            }
            Err(e) if e.is_unreachable() => {
                info!(kind = %R::KIND, record = %key, error = %e, "edge unreachable, will retry");
                Self::mark_sync_failed(
                    record,
                    ConditionSeverity::Warning,
                    "EdgeUnreachable",
                    e.to_string(),
                );
                Ok(())
            }
            Err(e) => {
                warn!(kind = %R::KIND, record = %key, error = %e, "edge create failed");
                Self::mark_sync_failed(
                    record,
                    ConditionSeverity::Error,
                    "CreateFailed",
                    e.to_string(),
                );
                Err(e.into())
            }
        }
    }

    async fn reconcile_live(&self, record: &mut R) -> EngineResult<ReconcileResult> {
        if !record.is_synced() {
            self.create_or_adopt(record).await?;
            // Desired state is pushed on the next pass, against the stored edge id.
            return Ok(if record.is_synced() && record.is_managed() {
                ReconcileResult::requeue_immediate()
            } else {
                ReconcileResult::done()
            });
        }
        if record.is_managed() {
            self.managed.apply(record).await?;
        }
        Ok(ReconcileResult::done())
    }

    /// Folds conditions into the summary and writes status.
    async fn finish(
        &self,
        mut record: R,
        outcome: EngineResult<ReconcileResult>,
    ) -> EngineResult<ReconcileResult> {
        let managed = record.is_managed();
        let conditions = record.conditions_mut();
        if !managed {
            conditions.delete(R::KIND.managing_condition());
        }
        conditions.set_summary(
            READY_CONDITION,
            &[R::KIND.synced_condition(), R::KIND.managing_condition()],
        );

        match self.store.update_status(&record).await {
            Ok(_) => outcome,
            Err(e) if e.is_conflict() => {
                debug!(kind = %R::KIND, record = %record.key(), "status write conflicted, requeueing");
                outcome.map(|_| ReconcileResult::requeue_immediate())
            }
            Err(e) => {
                outcome?;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl<R: Resource> Reconciler for RecordReconciler<R> {
    type Record = R;

    async fn reconcile(&self, key: &ObjectKey) -> EngineResult<ReconcileResult> {
        let record = match self.store.get(key).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return Ok(ReconcileResult::done()),
            Err(e) => return Err(e.into()),
        };

        if record.node_pool() != self.node_pool {
            debug!(kind = %R::KIND, record = %key, pool = %record.node_pool(), "belongs to another pool");
            return Ok(ReconcileResult::done());
        }

        if record.meta().is_deleting() {
            return self.reconcile_delete(record).await;
        }

        let mut record = self.ensure_finalizer(record).await?;
        let outcome = self.reconcile_live(&mut record).await;
        self.finish(record, outcome).await
    }
}
