//! Record and wire-object builders.

use devicesync_api::{
    AdminState, Device, DeviceProfile, DeviceService, OperatingState, EDGE_OBJECT_NAME_LABEL,
};
use devicesync_edge::wire::{NamedRef, WireDevice, WireDeviceProfile, WireDeviceService};

/// Namespace used by fixtures.
pub const NAMESPACE: &str = "default";

/// An unmanaged device in `pool`.
pub fn device(pool: &str, name: &str) -> Device {
    let mut device = Device::new(NAMESPACE, name);
    device.spec.node_pool = pool.to_string();
    device.spec.service = "device-virtual".to_string();
    device.spec.profile = "lamp-profile".to_string();
    device
}

/// A managed, unlocked, enabled device in `pool`.
pub fn managed_device(pool: &str, name: &str) -> Device {
    let mut device = device(pool, name);
    device.spec.managed = true;
    device.spec.admin_state = Some(AdminState::Unlocked);
    device.spec.operating_state = Some(OperatingState::Enabled);
    device
}

/// A device whose edge name differs from its local name.
pub fn device_for_edge_name(pool: &str, name: &str, edge_name: &str) -> Device {
    let mut device = device(pool, name);
    device
        .metadata
        .labels
        .insert(EDGE_OBJECT_NAME_LABEL.to_string(), edge_name.to_string());
    device
}

/// A device service in `pool`.
pub fn device_service(pool: &str, name: &str) -> DeviceService {
    let mut service = DeviceService::new(NAMESPACE, name);
    service.spec.node_pool = pool.to_string();
    service.spec.addressable.name = format!("{name}-address");
    service.spec.addressable.protocol = "HTTP".to_string();
    service.spec.addressable.address = name.to_string();
    service.spec.addressable.port = 49990;
    service
}

/// A device profile in `pool`.
pub fn device_profile(pool: &str, name: &str) -> DeviceProfile {
    let mut profile = DeviceProfile::new(NAMESPACE, name);
    profile.spec.node_pool = pool.to_string();
    profile.spec.manufacturer = "acme".to_string();
    profile.spec.model = "L-1".to_string();
    profile
}

/// A device as core-metadata would store it.
pub fn wire_device(name: &str) -> WireDevice {
    WireDevice {
        name: name.to_string(),
        admin_state: "UNLOCKED".to_string(),
        operating_state: "ENABLED".to_string(),
        service: NamedRef {
            id: String::new(),
            name: "device-virtual".to_string(),
        },
        profile: NamedRef {
            id: String::new(),
            name: "lamp-profile".to_string(),
        },
        last_connected: 1_600_000_000_000,
        ..WireDevice::default()
    }
}

/// A device service as core-metadata would store it.
pub fn wire_service(name: &str) -> WireDeviceService {
    WireDeviceService {
        name: name.to_string(),
        admin_state: "UNLOCKED".to_string(),
        operating_state: "ENABLED".to_string(),
        ..WireDeviceService::default()
    }
}

/// A device profile as core-metadata would store it.
pub fn wire_profile(name: &str) -> WireDeviceProfile {
    WireDeviceProfile {
        name: name.to_string(),
        manufacturer: "acme".to_string(),
        ..WireDeviceProfile::default()
    }
}
