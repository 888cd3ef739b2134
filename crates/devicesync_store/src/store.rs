//! The record store accessor trait.

use crate::error::StoreResult;
use async_trait::async_trait;
use devicesync_api::{ObjectKey, Resource};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Filters for `RecordStore::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Restrict to one namespace.
    pub namespace: Option<String>,
    /// Exact matches on indexed fields.
    pub field_selector: BTreeMap<String, String>,
    /// Exact matches on labels.
    pub label_selector: BTreeMap<String, String>,
}

impl ListOptions {
    /// Lists every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to a namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Adds an indexed-field match.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_selector.insert(field.into(), value.into());
        self
    }

    /// Adds a label match.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_selector.insert(key.into(), value.into());
        self
    }
}

/// A change notification from the store.
#[derive(Debug, Clone)]
pub enum WatchEvent<R> {
    /// A record was created.
    Added(R),
    /// A record was written.
    Modified {
        /// State before the write.
        old: R,
        /// State after the write.
        new: R,
    },
    /// A record was removed.
    Deleted(R),
}

impl<R: Resource> WatchEvent<R> {
    /// Key of the affected record.
    pub fn key(&self) -> ObjectKey {
        self.object().key()
    }

    /// The latest known state of the record.
    pub fn object(&self) -> &R {
        match self {
            WatchEvent::Added(r) | WatchEvent::Deleted(r) => r,
            WatchEvent::Modified { new, .. } => new,
        }
    }
}

/// Typed access to the desired-state store.
///
/// # Invariants
///
/// - `create` ignores any status on the input record
/// - `update` never changes status; `update_status` never changes spec or metadata
/// - Both writes fail with a conflict when the record's resource version is stale
/// - `delete` only marks a record while it still carries finalizers
/// - Removing the last finalizer from a marked record removes it
#[async_trait]
pub trait RecordStore<R: Resource>: Send + Sync {
    /// Fetches one record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the record does not exist.
    async fn get(&self, key: &ObjectKey) -> StoreResult<R>;

    /// Lists records matching the options, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexNotRegistered` if a field selector names
    /// a field without an index.
    async fn list(&self, options: &ListOptions) -> StoreResult<Vec<R>>;

    /// Creates a record and returns the stored copy.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the key is taken.
    async fn create(&self, record: &R) -> StoreResult<R>;

    /// Writes spec and metadata, keeping the stored status.
    ///
    /// A record without a resource version is written unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a stale version and
    /// `StoreError::Invalid` if an immutable field changed.
    async fn update(&self, record: &R) -> StoreResult<R>;

    /// Writes status only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a stale version.
    async fn update_status(&self, record: &R) -> StoreResult<R>;

    /// Applies a JSON merge patch to metadata and spec without a version check.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or the patch produces an
    /// invalid record.
    async fn patch(&self, key: &ObjectKey, patch: &serde_json::Value) -> StoreResult<R>;

    /// Requests deletion.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the record does not exist.
    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;

    /// Subscribes to change notifications.
    fn watch(&self) -> broadcast::Receiver<WatchEvent<R>>;
}
