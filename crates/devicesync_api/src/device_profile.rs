//! Device profile records.
//!
//! Profiles describe the resources and commands of a device model. They
//! carry no administrative or operating state, so their managed branch
//! only maintains conditions.

use crate::condition::Conditions;
use crate::meta::ObjectMeta;
use crate::resource::Kind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value description of a device resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    /// Value type after transformations.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub value_type: String,
    /// `R`, `W` or `RW`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub read_write: String,
    /// Minimum value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub minimum: String,
    /// Maximum value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maximum: String,
    /// Default value used when no argument is passed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,
    /// Multiplicative factor.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scale: String,
    /// Additive factor.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub offset: String,
    /// Decimal precision.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub precision: String,
    /// Media type of binary values.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
}

/// Units of a device resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Units {
    /// Unit type.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub unit_type: String,
    /// `R`, `W` or `RW`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub read_write: String,
    /// Unit name, e.g. `lux`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_value: String,
}

/// Value and units of a device resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProperty {
    /// Value description.
    #[serde(default)]
    pub value: PropertyValue,
    /// Units.
    #[serde(default)]
    pub units: Units,
}

/// A readable or writable value exposed by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResource {
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Resource name.
    pub name: String,
    /// Tag.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Value and units.
    #[serde(default)]
    pub properties: ProfileProperty,
    /// Driver-specific attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// One step of a device command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperation {
    /// Ordering index.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
    /// `get` or `set`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operation: String,
    /// Target device resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_resource: String,
    /// Fixed parameter value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
    /// Value mappings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, String>,
}

/// A named sequence of resource operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResource {
    /// Command name.
    pub name: String,
    /// Read steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub get: Vec<ResourceOperation>,
    /// Write steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set: Vec<ResourceOperation>,
}

/// An expected response of a core command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    /// HTTP status code, as a string.
    #[serde(default)]
    pub code: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Reading names returned on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_values: Vec<String>,
}

/// The get or put half of a core command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAction {
    /// Path template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Expected responses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<CommandResponse>,
    /// Fully resolved URL, filled in by the command service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Parameter names accepted by a put.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_names: Vec<String>,
}

/// A core command exposed through the command service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Edge-platform id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Command name.
    pub name: String,
    /// Read half.
    #[serde(default)]
    pub get: CommandAction,
    /// Write half.
    #[serde(default)]
    pub put: CommandAction,
}

/// Desired state of a device profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfileSpec {
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Manufacturer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    /// Model.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Labels on the edge-platform object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Device resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_resources: Vec<DeviceResource>,
    /// Device commands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_commands: Vec<ProfileResource>,
    /// Core commands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub core_commands: Vec<Command>,
    /// Whether desired state is pushed to the edge platform.
    #[serde(default)]
    pub managed: bool,
    /// Resource-pool affiliation.
    #[serde(default)]
    pub node_pool: String,
}

/// Observed state of a device profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfileStatus {
    /// Whether the record is paired with an edge-platform object.
    #[serde(default)]
    pub synced: bool,
    /// Identifier assigned by the edge platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    /// Status conditions.
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

/// A device profile record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: DeviceProfileSpec,
    /// Observed state.
    #[serde(default)]
    pub status: DeviceProfileStatus,
}

impl DeviceProfile {
    /// Creates an empty device profile record.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }
}

impl_resource!(DeviceProfile, DeviceProfileStatus, Kind::DeviceProfile);
