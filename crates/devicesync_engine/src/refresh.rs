//! Copying observed edge state into local records.

use async_trait::async_trait;
use devicesync_api::{Device, DeviceProfile, DeviceService, Resource};
use devicesync_edge::DevicePropertyClient;
use std::sync::Arc;
use tracing::debug;

/// Folds an edge record's observed state into the paired local record.
#[async_trait]
pub trait StatusRefresh<R>: Send + Sync {
    /// Updates `local.status` from `edge`. Never touches spec or metadata.
    async fn refresh(&self, local: &mut R, edge: &R);
}

/// Refreshes device timestamps, states, and property readings.
pub struct DeviceStatusRefresh {
    properties: Arc<dyn DevicePropertyClient>,
}

impl DeviceStatusRefresh {
    /// Creates the refresh step.
    pub fn new(properties: Arc<dyn DevicePropertyClient>) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl StatusRefresh<Device> for DeviceStatusRefresh {
    async fn refresh(&self, local: &mut Device, edge: &Device) {
        let status = &mut local.status;
        status.last_connected = edge.status.last_connected;
        status.last_reported = edge.status.last_reported;
        status.admin_state = edge.status.admin_state;
        status.operating_state = edge.status.operating_state;

        match self.properties.list_properties_state(local).await {
            Ok((_, actual)) => local.status.device_properties = actual,
            Err(e) => {
                debug!(record = %local.key(), error = %e, "keeping previous property readings")
            }
        }
    }
}

/// Refreshes device-service timestamps and states.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceServiceStatusRefresh;

#[async_trait]
impl StatusRefresh<DeviceService> for DeviceServiceStatusRefresh {
    async fn refresh(&self, local: &mut DeviceService, edge: &DeviceService) {
        let status = &mut local.status;
        status.last_connected = edge.status.last_connected;
        status.last_reported = edge.status.last_reported;
        status.admin_state = edge.status.admin_state;
        status.operating_state = edge.status.operating_state;
    }
}

/// Profiles have no observed state beyond the synced flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceProfileStatusRefresh;

#[async_trait]
impl StatusRefresh<DeviceProfile> for DeviceProfileStatusRefresh {
    async fn refresh(&self, _local: &mut DeviceProfile, _edge: &DeviceProfile) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::{AdminState, OperatingState};
    use devicesync_edge::{MockEdgeClient, Placement};

    #[tokio::test]
    async fn device_refresh_copies_observed_state() {
        let edge = Arc::new(MockEdgeClient::<Device>::new(Placement::default()));
        edge.set_property("lamp", "brightness", "30");
        let refresh = DeviceStatusRefresh::new(edge.clone());

        let mut remote = Device::new("", "lamp");
        remote.status.last_connected = 42;
        remote.status.admin_state = Some(AdminState::Unlocked);
        remote.status.operating_state = Some(OperatingState::Enabled);
        let mut local = Device::new("default", "lamp");
        local.spec.description = "kept".into();

        refresh.refresh(&mut local, &remote).await;
        assert_eq!(local.status.last_connected, 42);
        assert_eq!(local.status.admin_state, Some(AdminState::Unlocked));
        assert_eq!(local.status.device_properties["brightness"].actual_value, "30");
        assert_eq!(local.spec.description, "kept");
    }

    #[tokio::test]
    async fn property_listing_failure_keeps_readings() {
        let edge = Arc::new(MockEdgeClient::<Device>::new(Placement::default()));
        edge.set_unreachable(true);
        let refresh = DeviceStatusRefresh::new(edge.clone());

        let mut local = Device::new("default", "lamp");
        local.status.device_properties.insert(
            "brightness".into(),
            devicesync_api::ActualPropertyState {
                name: "brightness".into(),
                get_url: String::new(),
                actual_value: "10".into(),
            },
        );
        refresh.refresh(&mut local, &Device::new("", "lamp")).await;
        assert_eq!(local.status.device_properties["brightness"].actual_value, "10");
    }
}
