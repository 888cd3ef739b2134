//! Desired-state push for device services.

use super::{push_state_delta, ManagedState, OperableState};
use crate::error::EngineResult;
use async_trait::async_trait;
use devicesync_api::{AdminState, DeviceService, Kind, OperatingState};
use devicesync_edge::EdgeClient;
use std::sync::Arc;

/// Pushes device-service admin and operating state.
pub struct DeviceServiceManagedState {
    edge: Arc<dyn EdgeClient<DeviceService>>,
}

impl DeviceServiceManagedState {
    /// Creates the push step.
    pub fn new(edge: Arc<dyn EdgeClient<DeviceService>>) -> Self {
        Self { edge }
    }
}

impl OperableState for DeviceService {
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
impl ManagedState<DeviceService> for DeviceServiceManagedState {
    async fn apply(&self, service: &mut DeviceService) -> EngineResult<()> {
        push_state_delta(&*self.edge, service).await?;

        service
            .status
            .conditions
            .mark_true(Kind::DeviceService.managing_condition());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_edge::{EdgeError, MockEdgeClient, MockOp, Placement};

    #[tokio::test]
    async fn pushes_changed_state() {
        let edge = Arc::new(MockEdgeClient::<DeviceService>::new(Placement::default()));
        edge.insert("svc", DeviceService::new("", "svc"));
        let step = DeviceServiceManagedState::new(edge.clone());

        let mut service = DeviceService::new("default", "svc");
        service.spec.admin_state = Some(AdminState::Locked);
        service.status.operating_state = Some(OperatingState::Enabled);
        service.spec.operating_state = Some(OperatingState::Enabled);
        step.apply(&mut service).await.unwrap();

        let updates = edge.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].spec.admin_state, Some(AdminState::Locked));
        assert_eq!(updates[0].spec.operating_state, None);
        assert!(service
            .status
            .conditions
            .is_true(Kind::DeviceService.managing_condition()));
    }

    #[tokio::test]
    async fn failed_push_marks_condition() {
        let edge = Arc::new(MockEdgeClient::<DeviceService>::new(Placement::default()));
        edge.insert("svc", DeviceService::new("", "svc"));
        edge.fail_next(MockOp::Update, EdgeError::Unreachable("down".into()));
        let step = DeviceServiceManagedState::new(edge.clone());

        let mut service = DeviceService::new("default", "svc");
        service.spec.admin_state = Some(AdminState::Unlocked);
        assert!(step.apply(&mut service).await.is_err());
        assert!(service
            .status
            .conditions
            .is_false(Kind::DeviceService.managing_condition()));
        assert_eq!(service.status.admin_state, None);
    }
}
