//! Edge client traits.

use crate::error::EdgeResult;
use async_trait::async_trait;
use devicesync_api::{ActualPropertyState, DesiredPropertyState, Device, Resource};
use std::collections::BTreeMap;

/// Filter for `EdgeClient::list`. The platform supports one label at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeListOptions {
    /// Only objects carrying this label.
    pub label: Option<String>,
}

impl EdgeListOptions {
    /// Lists every object.
    pub fn all() -> Self {
        Self::default()
    }

    /// Lists objects carrying `label`.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

/// CRUD access to one kind on the edge platform.
///
/// Objects are addressed by their edge-platform name. Records returned by
/// `get` and `list` are already translated into local form: named for the
/// client's pool, tagged with the back-reference label, and carrying the
/// edge id and observed state in status.
#[async_trait]
pub trait EdgeClient<R: Resource>: Send + Sync {
    /// Creates the object and returns the id the platform assigned.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::AlreadyExists` if the name is taken.
    async fn create(&self, record: &R) -> EdgeResult<String>;

    /// Deletes the object by name.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::NotFound` if it does not exist.
    async fn delete(&self, edge_name: &str) -> EdgeResult<()>;

    /// Pushes the state fields set in `record`'s spec.
    ///
    /// Returns `None` when there was nothing to send.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::Rejected` if the platform refuses the change.
    async fn update(&self, record: &R) -> EdgeResult<Option<R>>;

    /// Fetches the object by name.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::NotFound` if it does not exist.
    async fn get(&self, edge_name: &str) -> EdgeResult<R>;

    /// Lists objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing could not be fetched or decoded in full.
    async fn list(&self, options: &EdgeListOptions) -> EdgeResult<Vec<R>>;
}

/// Desired and actual property maps, keyed by property name.
pub type PropertyStates = (
    BTreeMap<String, DesiredPropertyState>,
    BTreeMap<String, ActualPropertyState>,
);

/// Read and write access to device properties.
///
/// URLs come from the command metadata of the device. A read reuses the
/// get-URL cached in the device status when present.
#[async_trait]
pub trait DevicePropertyClient: Send + Sync {
    /// Reads one property.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::PropertyNotFound` if the device has no such
    /// command and `EdgeError::NotFound` if the read returned 404.
    async fn get_property_state(
        &self,
        property: &str,
        device: &Device,
    ) -> EdgeResult<ActualPropertyState>;

    /// Writes one property's desired value.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::Rejected` if the write was refused.
    async fn update_property_state(
        &self,
        desired: &DesiredPropertyState,
        device: &Device,
    ) -> EdgeResult<()>;

    /// Reads every property the device exposes.
    ///
    /// Properties whose read fails are returned without a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the command metadata could not be fetched.
    async fn list_properties_state(&self, device: &Device) -> EdgeResult<PropertyStates>;
}
