//! Desired-state push for devices: admin/operating state, then properties.

use super::{push_state_delta, ManagedState, OperableState};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use devicesync_api::{AdminState, ConditionSeverity, Device, Kind, OperatingState, Resource};
use devicesync_edge::{DevicePropertyClient, EdgeClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pushes device state and property values.
pub struct DeviceManagedState {
    edge: Arc<dyn EdgeClient<Device>>,
    properties: Arc<dyn DevicePropertyClient>,
}

impl DeviceManagedState {
    /// Creates the push step.
    pub fn new(edge: Arc<dyn EdgeClient<Device>>, properties: Arc<dyn DevicePropertyClient>) -> Self {
        Self { edge, properties }
    }

    /// Brings every desired property to its value. Returns the names that failed.
    async fn push_properties(&self, device: &mut Device) -> Vec<String> {
        let mut failed = Vec::new();
        let desired: Vec<_> = device.spec.device_properties.values().cloned().collect();

        for want in desired {
            let mut actual = match self.properties.get_property_state(&want.name, device).await {
                Ok(actual) => actual,
                Err(e) if e.is_not_found() => {
                    debug!(record = %device.key(), property = %want.name, "property has no reading yet");
                    continue;
                }
                Err(e) => {
                    warn!(record = %device.key(), property = %want.name, error = %e, "property read failed");
                    failed.push(want.name.clone());
                    continue;
                }
            };

            if actual.actual_value != want.desired_value {
                match self.properties.update_property_state(&want, device).await {
                    Ok(()) => {
                        info!(
                            record = %device.key(),
                            property = %want.name,
                            from = %actual.actual_value,
                            to = %want.desired_value,
                            "property updated"
                        );
                        actual.actual_value = want.desired_value.clone();
                    }
                    Err(e) => {
                        warn!(record = %device.key(), property = %want.name, error = %e, "property write failed");
                        failed.push(want.name.clone());
                    }
                }
            }
            device
                .status
                .device_properties
                .insert(want.name.clone(), actual);
        }
        failed
    }
}

impl OperableState for Device {
    fn desired_states(&self) -> (Option<AdminState>, Option<OperatingState>) {
        (self.spec.admin_state, self.spec.operating_state)
    }

    fn observed_states(&self) -> (Option<AdminState>, Option<OperatingState>) {
        (self.status.admin_state, self.status.operating_state)
    }

    fn set_desired_states(&mut self, admin: Option<AdminState>, operating: Option<OperatingState>) {
        self.spec.admin_state = admin;
        self.spec.operating_state = operating;
    }

    fn set_observed_states(&mut self, admin: Option<AdminState>, operating: Option<OperatingState>) {
        self.status.admin_state = admin;
        self.status.operating_state = operating;
    }
}

#[async_trait]
impl ManagedState<Device> for DeviceManagedState {
    async fn apply(&self, device: &mut Device) -> EngineResult<()> {
        push_state_delta(&*self.edge, device).await?;

        if !device.is_operable() {
            debug!(record = %device.key(), "device not operable, skipping properties");
            device
                .status
                .conditions
                .mark_true(Kind::Device.managing_condition());
            return Ok(());
        }

        let failed = self.push_properties(device).await;
        if failed.is_empty() {
            device
                .status
                .conditions
                .mark_true(Kind::Device.managing_condition());
            return Ok(());
        }

        device.status.conditions.mark_false(
            Kind::Device.managing_condition(),
            ConditionSeverity::Warning,
            "PropertyUpdateFailed",
            format!("failed properties: {}", failed.join(", ")),
        );
        Err(EngineError::PropertyReconcile { failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::{AdminState, OperatingState};
    use devicesync_edge::{EdgeCall, EdgeError, MockEdgeClient, MockOp, Placement};

    fn setup() -> (Arc<MockEdgeClient<Device>>, DeviceManagedState) {
        let edge = Arc::new(MockEdgeClient::<Device>::new(Placement::new("default", "p")));
        let step = DeviceManagedState::new(edge.clone(), edge.clone());
        (edge, step)
    }

    fn operable(name: &str) -> Device {
        let mut device = Device::new("default", name);
        device.spec.managed = true;
        device.status.admin_state = Some(AdminState::Unlocked);
        device.status.operating_state = Some(OperatingState::Enabled);
        device
    }

    #[tokio::test]
    async fn writes_only_differing_properties() {
        let (edge, step) = setup();
        edge.insert("lamp", Device::new("", "lamp"));
        edge.set_property("lamp", "brightness", "30");
        edge.set_property("lamp", "color", "red");

        let mut device = operable("lamp")
            .with_desired_property("brightness", "50")
            .with_desired_property("color", "red");
        step.apply(&mut device).await.unwrap();

        assert_eq!(edge.property("lamp", "brightness").as_deref(), Some("50"));
        assert_eq!(
            edge.count_calls(|c| matches!(c, EdgeCall::UpdateProperty { .. })),
            1
        );
        assert_eq!(device.status.device_properties["brightness"].actual_value, "50");
        assert!(device
            .status
            .conditions
            .is_true(Kind::Device.managing_condition()));
    }

    #[tokio::test]
    async fn property_failures_are_collected() {
        let (edge, step) = setup();
        edge.insert("lamp", Device::new("", "lamp"));
        edge.set_property("lamp", "brightness", "30");

        let mut device = operable("lamp")
            .with_desired_property("brightness", "50")
            .with_desired_property("missing", "1");
        let err = step.apply(&mut device).await.unwrap_err();

        match err {
            EngineError::PropertyReconcile { failed } => assert_eq!(failed, vec!["missing"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(edge.property("lamp", "brightness").as_deref(), Some("50"));
        let cond = device
            .status
            .conditions
            .get(Kind::Device.managing_condition())
            .unwrap();
        assert!(cond.message.contains("missing"));
    }

    #[tokio::test]
    async fn unreported_property_is_skipped() {
        let (edge, step) = setup();
        edge.insert("lamp", Device::new("", "lamp"));
        edge.fail_next(MockOp::GetProperty, EdgeError::NotFound("no reading".into()));

        let mut device = operable("lamp").with_desired_property("brightness", "50");
        step.apply(&mut device).await.unwrap();
        assert_eq!(
            edge.count_calls(|c| matches!(c, EdgeCall::UpdateProperty { .. })),
            0
        );
    }

    #[tokio::test]
    async fn state_push_sends_only_changes() {
        let (edge, step) = setup();
        edge.insert("lamp", Device::new("", "lamp"));

        let mut device = operable("lamp");
        device.spec.admin_state = Some(AdminState::Locked);
        device.spec.operating_state = Some(OperatingState::Enabled);
        step.apply(&mut device).await.unwrap();

        let updates = edge.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].spec.admin_state, Some(AdminState::Locked));
        assert_eq!(updates[0].spec.operating_state, None);
        assert_eq!(device.status.admin_state, Some(AdminState::Locked));

        step.apply(&mut device).await.unwrap();
        assert_eq!(edge.updates().len(), 1);
    }

    #[tokio::test]
    async fn locked_device_skips_properties() {
        let (edge, step) = setup();
        edge.insert("lamp", Device::new("", "lamp"));
        edge.set_property("lamp", "brightness", "30");

        let mut device = operable("lamp").with_desired_property("brightness", "50");
        device.status.admin_state = Some(AdminState::Locked);
        step.apply(&mut device).await.unwrap();

        assert_eq!(edge.property("lamp", "brightness").as_deref(), Some("30"));
    }
}
