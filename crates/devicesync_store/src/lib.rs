//! # devicesync Store
//!
//! Typed access to the declarative desired-state store.
//!
//! This crate provides:
//! - `RecordStore<R>`: get/list/create/update/patch/delete plus a separate
//!   status write path and a watch stream
//! - `InMemoryStore<R>`: a version-stamped in-memory implementation
//! - `Scheme`: explicit one-time registration of record kinds
//! - Field indexes for pool-affiliation lookups
//! - JSON merge patch for metadata edits
//!
//! ## Concurrency
//!
//! Every write carries an opaque resource version. A write whose version
//! does not match the stored one fails with `StoreError::Conflict`; callers
//! treat that as "retry later", never as a hard failure. This is the only
//! mutual-exclusion primitive between the reconcilers and the syncers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod index;
mod memory;
mod patch;
mod scheme;
mod store;

pub use error::{StoreError, StoreResult};
pub use index::{node_pool_indexer, FieldIndexer, NODE_POOL_FIELD};
pub use memory::InMemoryStore;
pub use patch::merge_patch;
pub use scheme::Scheme;
pub use store::{ListOptions, RecordStore, WatchEvent};
