//! Record kind registration.

use crate::error::{StoreError, StoreResult};
use devicesync_api::Kind;
use std::collections::BTreeSet;

/// The set of record kinds a process is allowed to store.
///
/// Built once at startup, before any store is opened or any loop starts.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: BTreeSet<&'static str>,
}

impl Scheme {
    /// Creates an empty scheme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheme with every reconciled kind registered.
    pub fn with_device_kinds() -> Self {
        Kind::ALL
            .iter()
            .fold(Self::new(), |scheme, kind| scheme.register(*kind))
    }

    /// Registers a kind.
    pub fn register(mut self, kind: Kind) -> Self {
        self.kinds.insert(kind.as_str());
        self
    }

    /// Returns true if the kind is registered.
    pub fn is_registered(&self, kind: Kind) -> bool {
        self.kinds.contains(kind.as_str())
    }

    /// Checks that a kind is registered.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KindNotRegistered` otherwise.
    pub fn ensure_registered(&self, kind: Kind) -> StoreResult<()> {
        if self.is_registered(kind) {
            Ok(())
        } else {
            Err(StoreError::KindNotRegistered(kind))
        }
    }
}
