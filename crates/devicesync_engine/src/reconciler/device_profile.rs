//! Profiles carry no pushable state once created.

use super::ManagedState;
use crate::error::EngineResult;
use async_trait::async_trait;
use devicesync_api::{DeviceProfile, Kind};

/// Managed step for profiles. Only records the managing condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceProfileManagedState;

#[async_trait]
impl ManagedState<DeviceProfile> for DeviceProfileManagedState {
    async fn apply(&self, profile: &mut DeviceProfile) -> EngineResult<()> {
        profile
            .status
            .conditions
            .mark_true(Kind::DeviceProfile.managing_condition());
        Ok(())
    }
}
