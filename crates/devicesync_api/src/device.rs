//! Device records.

use crate::condition::Conditions;
use crate::meta::ObjectMeta;
use crate::resource::Kind;
use crate::state::{AdminState, OperatingState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired value of one device property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredPropertyState {
    /// Property (command) name.
    pub name: String,
    /// URL used to write the property. Resolved from command metadata when empty.
    #[serde(default, rename = "putURL", skip_serializing_if = "String::is_empty")]
    pub put_url: String,
    /// Value to push.
    #[serde(default)]
    pub desired_value: String,
}

/// Last observed value of one device property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualPropertyState {
    /// Property (command) name.
    pub name: String,
    /// URL used to read the property, cached after first resolution.
    #[serde(default, rename = "getURL", skip_serializing_if = "String::is_empty")]
    pub get_url: String,
    /// Observed value.
    #[serde(default)]
    pub actual_value: String,
}

/// Desired state of a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Desired administrative state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
    /// Desired operating state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_state: Option<OperatingState>,
    /// Protocol name to protocol properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub protocols: BTreeMap<String, BTreeMap<String, String>>,
    /// Labels on the edge-platform object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Opaque location payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    /// Name of the owning device service.
    #[serde(default)]
    pub service: String,
    /// Name of the device profile.
    #[serde(default)]
    pub profile: String,
    /// Whether desired state is pushed to the edge platform.
    #[serde(default)]
    pub managed: bool,
    /// Resource-pool affiliation.
    #[serde(default)]
    pub node_pool: String,
    /// Desired property values, by property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub device_properties: BTreeMap<String, DesiredPropertyState>,
}

/// Observed state of a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Last connection time reported by the edge platform (ms since epoch).
    #[serde(default)]
    pub last_connected: i64,
    /// Last report time (ms since epoch).
    #[serde(default)]
    pub last_reported: i64,
    /// Whether the record is paired with an edge-platform object.
    #[serde(default)]
    pub synced: bool,
    /// Observed property values, by property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub device_properties: BTreeMap<String, ActualPropertyState>,
    /// Identifier assigned by the edge platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    /// Last observed administrative state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
    /// Last observed operating state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_state: Option<OperatingState>,
    /// Status conditions.
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

/// A device record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: DeviceSpec,
    /// Observed state.
    #[serde(default)]
    pub status: DeviceStatus,
}

impl Device {
    /// Creates an empty device record.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    /// Adds a desired property value.
    pub fn with_desired_property(mut self, name: &str, value: &str) -> Self {
        self.spec.device_properties.insert(
            name.to_string(),
            DesiredPropertyState {
                name: name.to_string(),
                put_url: String::new(),
                desired_value: value.to_string(),
            },
        );
        self
    }

    /// Returns true if the device accepts property writes.
    pub fn is_operable(&self) -> bool {
        let admin = self.status.admin_state.or(self.spec.admin_state);
        let operating = self.status.operating_state.or(self.spec.operating_state);
        admin == Some(AdminState::Unlocked) && operating == Some(OperatingState::Enabled)
    }
}

impl_resource!(Device, DeviceStatus, Kind::Device);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{IsSynced, Resource};

    #[test]
    fn mark_synced_sets_edge_id() {
        let mut device = Device::new("default", "lamp");
        assert!(!device.is_synced());
        assert_eq!(device.edge_id(), None);

        device.mark_synced("edge-42".into());
        assert!(device.is_synced());
        assert_eq!(device.edge_id(), Some("edge-42"));

        device.mark_unsynced();
        assert!(!device.is_synced());
        assert_eq!(device.edge_id(), Some("edge-42"));
    }

    #[test]
    fn operable_requires_unlocked_and_enabled() {
        let mut device = Device::new("default", "lamp");
        assert!(!device.is_operable());

        device.status.admin_state = Some(AdminState::Unlocked);
        device.status.operating_state = Some(OperatingState::Enabled);
        assert!(device.is_operable());

        device.status.admin_state = Some(AdminState::Locked);
        assert!(!device.is_operable());
    }

    #[test]
    fn property_urls_use_uppercase_wire_names() {
        let aps = ActualPropertyState {
            name: "brightness".into(),
            get_url: "http://cmd/brightness".into(),
            actual_value: "30".into(),
        };
        let json = serde_json::to_value(&aps).unwrap();
        assert_eq!(json["getURL"], "http://cmd/brightness");
        assert_eq!(json["actualValue"], "30");
    }
}
