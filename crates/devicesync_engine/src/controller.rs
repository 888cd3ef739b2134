//! Event-driven controller runtime.
//!
//! Watches one store for changes, queues the affected keys, and runs the
//! reconciler for them on a fixed pool of workers. Failed keys come back
//! with exponential backoff; every key is re-queued each resync period.

use crate::config::{ControllerConfig, RetryConfig};
use crate::reconcile::{ReconcileResult, Reconciler};
use crate::workqueue::WorkQueue;
use devicesync_api::{IsSynced, ObjectKey, Resource};
use devicesync_store::{ListOptions, RecordStore, WatchEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Returns false for the update produced by a record's own first sync.
///
/// The reconciler writes `synced = true` as the last step of creating an
/// edge object; reacting to that write would only repeat the work.
pub fn should_enqueue<R: IsSynced>(event: &WatchEvent<R>) -> bool {
    match event {
        WatchEvent::Modified { old, new } => old.is_synced() || !new.is_synced(),
        WatchEvent::Added(_) | WatchEvent::Deleted(_) => true,
    }
}

/// Runs a reconciler against one store.
pub struct Controller<Rc: Reconciler> {
    reconciler: Arc<Rc>,
    store: Arc<dyn RecordStore<Rc::Record>>,
    config: ControllerConfig,
    queue: Arc<WorkQueue>,
}

impl<Rc: Reconciler> Controller<Rc> {
    /// Creates a controller.
    pub fn new(
        reconciler: Arc<Rc>,
        store: Arc<dyn RecordStore<Rc::Record>>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            reconciler,
            store,
            config,
            queue: Arc::new(WorkQueue::new()),
        }
    }

    /// The controller's queue.
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Runs until `stop` turns true, then waits for in-flight work.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        let kind = <Rc::Record as Resource>::KIND;
        let mut events = self.store.watch();
        self.enqueue_all().await;

        let workers: Vec<JoinHandle<()>> = (0..self.config.workers)
            .map(|id| {
                let queue = Arc::clone(&self.queue);
                let reconciler = Arc::clone(&self.reconciler);
                let retry = self.config.retry.clone();
                tokio::spawn(async move {
                    while let Some(key) = queue.get().await {
                        process(&*reconciler, &queue, &retry, key).await;
                    }
                    debug!(kind = %kind, worker = id, "worker exited");
                })
            })
            .collect();
        info!(kind = %kind, workers = self.config.workers, "controller started");

        let mut resync = tokio::time::interval(self.config.resync_period);
        resync.set_missed_tick_behavior(MissedTickBehavior::Skip);
        resync.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if should_enqueue(&event) {
                            self.queue.add(event.key());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(kind = %kind, missed, "watch lagged, re-listing");
                        self.enqueue_all().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!(kind = %kind, "watch closed");
                        break;
                    }
                },
                _ = resync.tick() => {
                    debug!(kind = %kind, "periodic resync");
                    self.enqueue_all().await;
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        self.queue.shutdown();
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(kind = %kind, error = %e, "worker panicked");
            }
        }
        info!(kind = %kind, "controller stopped");
    }

    async fn enqueue_all(&self) {
        match self.store.list(&ListOptions::all()).await {
            Ok(records) => {
                for record in records {
                    self.queue.add(record.key());
                }
            }
            Err(e) => warn!(
                kind = %<Rc::Record as Resource>::KIND,
                error = %e,
                "listing for resync failed"
            ),
        }
    }
}

async fn process<Rc: Reconciler>(
    reconciler: &Rc,
    queue: &Arc<WorkQueue>,
    retry: &RetryConfig,
    key: ObjectKey,
) {
    let kind = <Rc::Record as Resource>::KIND;
    match reconciler.reconcile(&key).await {
        Ok(ReconcileResult {
            requeue_after: Some(after),
            ..
        }) => {
            queue.forget(&key);
            queue.add_after(key.clone(), after);
        }
        Ok(ReconcileResult { requeue: true, .. }) => {
            queue.forget(&key);
            queue.add(key.clone());
        }
        Ok(_) => queue.forget(&key),
        Err(e) => {
            let (attempt, delay) = queue.backoff(&key, retry);
            if e.is_conflict() {
                debug!(kind = %kind, record = %key, attempt, "conflict, retrying");
            } else {
                warn!(kind = %kind, record = %key, attempt, delay = ?delay, error = %e, "reconcile failed");
            }
            queue.add_after(key.clone(), delay);
        }
    }
    queue.done(&key);
}
