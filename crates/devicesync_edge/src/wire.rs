//! JSON models of the edge platform's legacy REST API.

use devicesync_api::{Addressable, Command, DeviceResource, ProfileResource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to another object by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Edge-platform id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Object name.
    #[serde(default)]
    pub name: String,
}

/// A device as stored by core-metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDevice {
    /// Edge id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Device name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// `LOCKED` / `UNLOCKED`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub admin_state: String,
    /// `ENABLED` / `DISABLED`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operating_state: String,
    /// Protocol properties.
    #[serde(default)]
    pub protocols: BTreeMap<String, BTreeMap<String, String>>,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    /// Owning service.
    #[serde(default)]
    pub service: NamedRef,
    /// Profile.
    #[serde(default)]
    pub profile: NamedRef,
    /// Last connected (ms).
    #[serde(default)]
    pub last_connected: i64,
    /// Last reported (ms).
    #[serde(default)]
    pub last_reported: i64,
}

/// A device service as stored by core-metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDeviceService {
    /// Edge id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Service name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Last connected (ms).
    #[serde(default)]
    pub last_connected: i64,
    /// Last reported (ms).
    #[serde(default)]
    pub last_reported: i64,
    /// `ENABLED` / `DISABLED`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operating_state: String,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Where the service listens.
    #[serde(default)]
    pub addressable: Addressable,
    /// `LOCKED` / `UNLOCKED`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub admin_state: String,
}

/// A device profile as stored by core-metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDeviceProfile {
    /// Edge id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Profile name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: String,
    /// Model.
    #[serde(default)]
    pub model: String,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Device resources.
    #[serde(default)]
    pub device_resources: Vec<DeviceResource>,
    /// Device commands.
    #[serde(default)]
    pub device_commands: Vec<ProfileResource>,
    /// Core commands.
    #[serde(default)]
    pub core_commands: Vec<Command>,
}

/// Command metadata for one device, served by core-command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCommandResponse {
    /// Device id.
    #[serde(default)]
    pub id: String,
    /// Device name.
    #[serde(default)]
    pub name: String,
    /// Commands with resolved URLs.
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// One reading in an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReading {
    /// Reading (resource) name.
    pub name: String,
    /// Value as text.
    #[serde(default)]
    pub value: String,
}

/// The event returned by a property read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Device name.
    #[serde(default)]
    pub device: String,
    /// Origin timestamp.
    #[serde(default)]
    pub origin: i64,
    /// Readings.
    #[serde(default)]
    pub readings: Vec<WireReading>,
}
