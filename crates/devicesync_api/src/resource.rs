//! The `Resource` abstraction the engine is generic over.

use crate::condition::Conditions;
use crate::error::{ApiError, ApiResult};
use crate::meta::{ObjectKey, ObjectMeta, EDGE_OBJECT_NAME_LABEL};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record kinds the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// A physical or virtual device.
    Device,
    /// The edge service that drives a set of devices.
    DeviceService,
    /// Describes resources and commands shared by devices of one model.
    DeviceProfile,
}

impl Kind {
    /// All reconciled kinds.
    pub const ALL: [Kind; 3] = [Kind::Device, Kind::DeviceService, Kind::DeviceProfile];

    /// Returns the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Device => "Device",
            Kind::DeviceService => "DeviceService",
            Kind::DeviceProfile => "DeviceProfile",
        }
    }

    /// Deletion guard token placed on propagated records.
    pub fn finalizer(&self) -> &'static str {
        match self {
            Kind::Device => "devicesync.io/device-finalizer",
            Kind::DeviceService => "devicesync.io/deviceservice-finalizer",
            Kind::DeviceProfile => "devicesync.io/deviceprofile-finalizer",
        }
    }

    /// Condition type tracking presence on the edge platform.
    pub fn synced_condition(&self) -> &'static str {
        match self {
            Kind::Device => "DeviceSynced",
            Kind::DeviceService => "DeviceServiceSynced",
            Kind::DeviceProfile => "DeviceProfileSynced",
        }
    }

    /// Condition type tracking desired-state pushes.
    pub fn managing_condition(&self) -> &'static str {
        match self {
            Kind::Device => "DeviceManaging",
            Kind::DeviceService => "DeviceServiceManaging",
            Kind::DeviceProfile => "DeviceProfileManaging",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports whether a record is already paired with an edge-platform object.
///
/// Only used to filter the update event produced by the engine's own
/// unsynced-to-synced status write.
pub trait IsSynced {
    /// Returns the synced flag from the record status.
    fn is_synced(&self) -> bool;
}

/// A record kind stored locally and mirrored on the edge platform.
pub trait Resource:
    IsSynced + Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Observed status, written only through the status path.
    type Status: Clone + Default + fmt::Debug + PartialEq + Send + Sync;

    /// The record kind.
    const KIND: Kind;

    /// Record metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Mutable record metadata.
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Observed status.
    fn status(&self) -> &Self::Status;

    /// Mutable observed status.
    fn status_mut(&mut self) -> &mut Self::Status;

    /// Resource-pool affiliation.
    fn node_pool(&self) -> &str;

    /// Sets the resource-pool affiliation.
    fn set_node_pool(&mut self, pool: &str);

    /// Whether desired state is pushed to the edge platform.
    fn is_managed(&self) -> bool;

    /// Sets the managed flag.
    fn set_managed(&mut self, managed: bool);

    /// Identifier assigned by the edge platform.
    fn edge_id(&self) -> Option<&str>;

    /// Records the edge identifier and marks the record synced.
    fn mark_synced(&mut self, edge_id: String);

    /// Clears the synced flag, keeping the last edge identifier.
    fn mark_unsynced(&mut self);

    /// Status conditions.
    fn conditions(&self) -> &Conditions;

    /// Mutable status conditions.
    fn conditions_mut(&mut self) -> &mut Conditions;

    /// Record name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Record key.
    fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    /// Checks that an update from `old` to `self` keeps invariants.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ImmutableField` if a non-empty node pool changed.
    fn validate_update(&self, old: &Self) -> ApiResult<()> {
        if !old.node_pool().is_empty() && old.node_pool() != self.node_pool() {
            return Err(ApiError::ImmutableField {
                field: "spec.nodePool",
                old: old.node_pool().to_string(),
                new: self.node_pool().to_string(),
            });
        }
        Ok(())
    }
}

/// Returns the edge-platform name a local record correlates to.
///
/// The back-reference label is authoritative; records created locally
/// without one use their own name.
pub fn edge_name<R: Resource>(record: &R) -> &str {
    record
        .meta()
        .labels
        .get(EDGE_OBJECT_NAME_LABEL)
        .map(String::as_str)
        .unwrap_or_else(|| record.name())
}

/// Derives the local record name for an edge-platform object in a pool.
pub fn local_name(pool: &str, edge_name: &str) -> String {
    if pool.is_empty() {
        edge_name.to_lowercase()
    } else {
        format!("{}-{}", pool, edge_name).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    #[test]
    fn local_name_is_lowercase_and_prefixed() {
        assert_eq!(local_name("hangzhou", "Sensor-1"), "hangzhou-sensor-1");
        assert_eq!(local_name("", "Sensor-1"), "sensor-1");
    }

    #[test]
    fn edge_name_prefers_label() {
        let mut device = Device::new("default", "hangzhou-sensor-1");
        assert_eq!(edge_name(&device), "hangzhou-sensor-1");

        device
            .metadata
            .labels
            .insert(EDGE_OBJECT_NAME_LABEL.to_string(), "Sensor-1".to_string());
        assert_eq!(edge_name(&device), "Sensor-1");
    }

    #[test]
    fn node_pool_is_immutable_once_set() {
        let mut old = Device::new("default", "lamp");
        let mut new = old.clone();
        new.spec.node_pool = "pool-a".into();
        assert!(new.validate_update(&old).is_ok());

        old.spec.node_pool = "pool-a".into();
        new.spec.node_pool = "pool-b".into();
        assert!(matches!(
            new.validate_update(&old),
            Err(ApiError::ImmutableField { .. })
        ));
    }

    #[test]
    fn kind_constants_are_distinct() {
        let finalizers: std::collections::HashSet<_> =
            Kind::ALL.iter().map(|k| k.finalizer()).collect();
        assert_eq!(finalizers.len(), 3);
        assert_eq!(Kind::Device.synced_condition(), "DeviceSynced");
    }
}
