//! A de-duplicating work queue of record keys.
//!
//! # Invariants
//!
//! - A key is queued at most once, however often it is added
//! - A key handed to a worker is not handed to another until `done`
//! - A key added while being processed is queued again on `done`

use crate::config::RetryConfig;
use devicesync_api::ObjectKey;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
    shutdown: bool,
}

/// Queue shared by a controller's event loop and its workers.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Notify,
}

impl WorkQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `key` unless it is already waiting.
    pub fn add(&self, key: ObjectKey) {
        let mut state = self.state.lock();
        if state.shutdown || !state.dirty.insert(key.clone()) {
            return;
        }
        if !state.processing.contains(&key) {
            state.queue.push_back(key);
            drop(state);
            self.ready.notify_one();
        }
    }

    /// Queues `key` after `delay`.
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Records a failure for `key` and returns how long to wait before retrying.
    pub fn backoff(&self, key: &ObjectKey, retry: &RetryConfig) -> (u32, Duration) {
        let mut state = self.state.lock();
        let attempts = state.failures.entry(key.clone()).or_insert(0);
        *attempts = attempts.saturating_add(1);
        (*attempts, retry.delay_for_attempt(*attempts))
    }

    /// Clears the failure count for `key`.
    pub fn forget(&self, key: &ObjectKey) {
        self.state.lock().failures.remove(key);
    }

    /// Waits for the next key. Returns `None` once shut down.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.ready.notified();
            {
                let mut state = self.state.lock();
                if state.shutdown {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    let more = !state.queue.is_empty();
                    drop(state);
                    if more {
                        self.ready.notify_one();
                    }
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Marks `key` finished, re-queueing it if it was added meanwhile.
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.state.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.ready.notify_one();
        }
    }

    /// Stops accepting keys and wakes every waiting worker.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.ready.notify_waiters();
    }

    /// Number of keys waiting.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns true if no key is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[tokio::test]
    async fn deduplicates_waiting_keys() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        queue.add(key("a"));
        queue.add(key("b"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get().await, Some(key("a")));
        assert_eq!(queue.get().await, Some(key("b")));
    }

    #[tokio::test]
    async fn key_in_flight_is_held_back() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        let taken = queue.get().await.unwrap();

        queue.add(key("a"));
        assert!(queue.is_empty());

        queue.done(&taken);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(key("a")));
    }

    #[tokio::test]
    async fn shutdown_releases_workers() {
        let queue = Arc::new(WorkQueue::new());
        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;
        queue.shutdown();
        assert_eq!(worker.await.unwrap(), None);

        queue.add(key("late"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn backoff_grows_until_forgotten() {
        let queue = WorkQueue::new();
        let retry = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(10))
            .without_jitter();

        assert_eq!(queue.backoff(&key("a"), &retry), (1, Duration::from_millis(10)));
        assert_eq!(queue.backoff(&key("a"), &retry), (2, Duration::from_millis(20)));
        queue.forget(&key("a"));
        assert_eq!(queue.backoff(&key("a"), &retry).0, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_add() {
        let queue = Arc::new(WorkQueue::new());
        queue.add_after(key("a"), Duration::from_secs(1));
        tokio::task::yield_now().await;
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(queue.len(), 1);
    }
}
