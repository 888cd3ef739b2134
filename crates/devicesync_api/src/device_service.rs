//! Device service records.

use crate::condition::Conditions;
use crate::meta::ObjectMeta;
use crate::resource::Kind;
use crate::state::{AdminState, OperatingState};
use serde::{Deserialize, Serialize};

/// Network address a device service is reachable at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addressable {
    /// Edge-platform id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Addressable name.
    #[serde(default)]
    pub name: String,
    /// Protocol, e.g. `HTTP`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    /// HTTP method.
    #[serde(default, rename = "method", skip_serializing_if = "String::is_empty")]
    pub http_method: String,
    /// Host.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// Port.
    #[serde(default)]
    pub port: u16,
    /// Base path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Message publisher.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    /// User.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Password.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Topic.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
}

/// Desired state of a device service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceServiceSpec {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Labels on the edge-platform object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Where the service listens.
    #[serde(default)]
    pub addressable: Addressable,
    /// Desired administrative state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
    /// Desired operating state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_state: Option<OperatingState>,
    /// Whether desired state is pushed to the edge platform.
    #[serde(default)]
    pub managed: bool,
    /// Resource-pool affiliation.
    #[serde(default)]
    pub node_pool: String,
}

/// Observed state of a device service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceServiceStatus {
    /// Last connection time (ms since epoch).
    #[serde(default)]
    pub last_connected: i64,
    /// Last report time (ms since epoch).
    #[serde(default)]
    pub last_reported: i64,
    /// Whether the record is paired with an edge-platform object.
    #[serde(default)]
    pub synced: bool,
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

/// A device service record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceService {
    /// Metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: DeviceServiceSpec,
    /// Observed state.
    #[serde(default)]
    pub status: DeviceServiceStatus,
}

impl DeviceService {
    /// Creates an empty device service record.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }
}

impl_resource!(DeviceService, DeviceServiceStatus, Kind::DeviceService);
