//! Translation between local records and edge-platform objects.

use crate::wire::{NamedRef, WireDevice, WireDeviceProfile, WireDeviceService, WireEvent};
use devicesync_api::{
    edge_name, local_name, AdminState, Command, Device, DeviceProfile, DeviceService,
    ObjectMeta, OperatingState, EDGE_OBJECT_NAME_LABEL,
};

/// Namespace and pool stamped onto records built from edge objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    /// Store namespace.
    pub namespace: String,
    /// Resource pool.
    pub node_pool: String,
}

impl Placement {
    /// Creates a placement.
    pub fn new(namespace: impl Into<String>, node_pool: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            node_pool: node_pool.into(),
        }
    }

    fn meta_for(&self, edge_name: &str) -> ObjectMeta {
        ObjectMeta::new(
            self.namespace.clone(),
            local_name(&self.node_pool, edge_name),
        )
        .with_label(EDGE_OBJECT_NAME_LABEL, edge_name)
    }
}

fn admin_state(raw: &str) -> Option<AdminState> {
    raw.parse().ok()
}

fn operating_state(raw: &str) -> Option<OperatingState> {
    raw.parse().ok()
}

fn edge_id(id: &str) -> Option<String> {
    (!id.is_empty()).then(|| id.to_string())
}

/// Builds the edge representation of a device.
pub fn device_to_wire(device: &Device) -> WireDevice {
    WireDevice {
        id: device.status.edge_id.clone().unwrap_or_default(),
        name: edge_name(device).to_string(),
        description: device.spec.description.clone(),
        admin_state: device
            .spec
            .admin_state
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        operating_state: device
            .spec
            .operating_state
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        protocols: device.spec.protocols.clone(),
        labels: device.spec.labels.clone(),
        location: device.spec.location.clone(),
        service: NamedRef {
            id: String::new(),
            name: device.spec.service.clone(),
        },
        profile: NamedRef {
            id: String::new(),
            name: device.spec.profile.clone(),
        },
        last_connected: device.status.last_connected,
        last_reported: device.status.last_reported,
    }
}

/// Builds a local device record from an edge device.
pub fn device_from_wire(wire: &WireDevice, placement: &Placement) -> Device {
    let mut device = Device {
        metadata: placement.meta_for(&wire.name),
        ..Default::default()
    };
    let spec = &mut device.spec;
    spec.description = wire.description.clone();
    spec.admin_state = admin_state(&wire.admin_state);
    spec.operating_state = operating_state(&wire.operating_state);
    spec.protocols = wire.protocols.clone();
    spec.labels = wire.labels.clone();
    spec.location = wire.location.clone();
    spec.service = wire.service.name.clone();
    spec.profile = wire.profile.name.clone();
    spec.node_pool = placement.node_pool.clone();

    let status = &mut device.status;
    status.edge_id = edge_id(&wire.id);
    status.synced = true;
    status.last_connected = wire.last_connected;
    status.last_reported = wire.last_reported;
    status.admin_state = spec.admin_state;
    status.operating_state = spec.operating_state;
    device
}

/// Builds the edge representation of a device service.
pub fn service_to_wire(service: &DeviceService) -> WireDeviceService {
    WireDeviceService {
        id: service.status.edge_id.clone().unwrap_or_default(),
        name: edge_name(service).to_string(),
        description: service.spec.description.clone(),
        last_connected: service.status.last_connected,
        last_reported: service.status.last_reported,
        operating_state: service
            .spec
            .operating_state
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        labels: service.spec.labels.clone(),
        addressable: service.spec.addressable.clone(),
        admin_state: service
            .spec
            .admin_state
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
    }
}

/// Builds a local device service record from an edge service.
pub fn service_from_wire(wire: &WireDeviceService, placement: &Placement) -> DeviceService {
    let mut service = DeviceService {
        metadata: placement.meta_for(&wire.name),
        ..Default::default()
    };
    let spec = &mut service.spec;
    spec.description = wire.description.clone();
    spec.labels = wire.labels.clone();
    spec.addressable = wire.addressable.clone();
    spec.admin_state = admin_state(&wire.admin_state);
    spec.operating_state = operating_state(&wire.operating_state);
    spec.node_pool = placement.node_pool.clone();

    let status = &mut service.status;
    status.edge_id = edge_id(&wire.id);
    status.synced = true;
    status.last_connected = wire.last_connected;
    status.last_reported = wire.last_reported;
    status.admin_state = spec.admin_state;
    status.operating_state = spec.operating_state;
    service
}

/// Builds the edge representation of a device profile.
pub fn profile_to_wire(profile: &DeviceProfile) -> WireDeviceProfile {
    WireDeviceProfile {
        id: profile.status.edge_id.clone().unwrap_or_default(),
        name: edge_name(profile).to_string(),
        description: profile.spec.description.clone(),
        manufacturer: profile.spec.manufacturer.clone(),
        model: profile.spec.model.clone(),
        labels: profile.spec.labels.clone(),
        device_resources: profile.spec.device_resources.clone(),
        device_commands: profile.spec.device_commands.clone(),
        core_commands: profile.spec.core_commands.clone(),
    }
}

/// Builds a local device profile record from an edge profile.
pub fn profile_from_wire(wire: &WireDeviceProfile, placement: &Placement) -> DeviceProfile {
    let mut profile = DeviceProfile {
        metadata: placement.meta_for(&wire.name),
        ..Default::default()
    };
    let spec = &mut profile.spec;
    spec.description = wire.description.clone();
    spec.manufacturer = wire.manufacturer.clone();
    spec.model = wire.model.clone();
    spec.labels = wire.labels.clone();
    spec.device_resources = wire.device_resources.clone();
    spec.device_commands = wire.device_commands.clone();
    spec.core_commands = wire.core_commands.clone();
    spec.node_pool = placement.node_pool.clone();

    profile.status.edge_id = edge_id(&wire.id);
    profile.status.synced = true;
    profile
}

/// Extracts a property value from a read event.
///
/// A lone reading counts only if its name matches. Several readings are
/// rendered as `name:value` pairs joined by `", "`.
pub fn property_value(reading_name: &str, event: &WireEvent) -> String {
    match event.readings.as_slice() {
        [only] if only.name == reading_name => only.value.clone(),
        [_] | [] => String::new(),
        many => many
            .iter()
            .map(|r| format!("{}:{}", r.name, r.value))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Name of the reading a command's read returns.
///
/// If the command declares exactly one expected value on its `200`
/// response, that is the reading name; otherwise the command name is used.
pub fn reading_name(command: &Command) -> &str {
    command
        .get
        .responses
        .iter()
        .filter(|r| r.code == "200" && r.expected_values.len() == 1)
        .last()
        .map(|r| r.expected_values[0].as_str())
        .unwrap_or(&command.name)
}
