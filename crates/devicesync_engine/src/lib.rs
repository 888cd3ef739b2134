//! # devicesync Engine
//!
//! Bidirectional synchronization between the local record store and the
//! edge platform.
//!
//! This crate provides:
//! - `RecordReconciler`: store-to-edge reconciliation with deletion guards
//! - `Syncer`: periodic edge-to-store discovery and status refresh
//! - `Controller`: watch-driven work queue with backoff and resync
//! - `SyncEngine`: both directions for every kind, under one stop signal
//!
//! ## Ownership
//!
//! The reconcilers own spec-driven writes to the edge platform. The syncers
//! own creation and removal of local records that mirror the edge, and
//! refresh of observed status. Both write status through the store's
//! versioned path, so neither can clobber the other.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
pub mod diff;
mod engine;
mod error;
mod reconcile;
mod reconciler;
mod refresh;
mod setup;
mod syncer;
mod workqueue;

pub use config::{ControllerConfig, EngineConfig, RetryConfig, SyncerConfig, MIN_SYNC_INTERVAL};
pub use controller::{should_enqueue, Controller};
pub use engine::{EdgeClients, Stores, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use reconcile::{ReconcileResult, Reconciler};
pub use reconciler::{
    DeviceManagedState, DeviceProfileManagedState, DeviceServiceManagedState, ManagedState,
    RecordReconciler,
};
pub use refresh::{
    DeviceProfileStatusRefresh, DeviceServiceStatusRefresh, DeviceStatusRefresh, StatusRefresh,
};
pub use setup::MemoryStores;
pub use syncer::{SyncRoundReport, Syncer};
pub use workqueue::WorkQueue;
