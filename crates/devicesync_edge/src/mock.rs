//! In-memory edge platform for tests.

use crate::client::{DevicePropertyClient, EdgeClient, EdgeListOptions, PropertyStates};
use crate::convert::Placement;
use crate::error::{EdgeError, EdgeResult};
use async_trait::async_trait;
use devicesync_api::{
    edge_name, local_name, ActualPropertyState, DesiredPropertyState, Device, Resource,
    EDGE_OBJECT_NAME_LABEL,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Operations a `MockEdgeClient` can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// `EdgeClient::create`.
    Create,
    /// `EdgeClient::delete`.
    Delete,
    /// `EdgeClient::update`.
    Update,
    /// `EdgeClient::get`.
    Get,
    /// `EdgeClient::list`.
    List,
    /// `DevicePropertyClient::get_property_state`.
    GetProperty,
    /// `DevicePropertyClient::update_property_state`.
    UpdateProperty,
}

/// A call observed by a `MockEdgeClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeCall {
    /// Create of the named object.
    Create(String),
    /// Delete of the named object.
    Delete(String),
    /// Update of the named object.
    Update(String),
    /// Get of the named object.
    Get(String),
    /// List.
    List,
    /// Property read.
    GetProperty {
        /// Edge device name.
        device: String,
        /// Property name.
        property: String,
    },
    /// Property write.
    UpdateProperty {
        /// Edge device name.
        device: String,
        /// Property name.
        property: String,
        /// Value sent.
        value: String,
    },
    /// Listing of all property states.
    ListProperties(String),
}

/// An in-memory stand-in for one kind on the edge platform.
///
/// Objects are keyed by edge name. Every call is recorded, and any
/// operation can be made to fail once, or the whole platform made
/// unreachable.
pub struct MockEdgeClient<R: Resource> {
    placement: Placement,
    objects: RwLock<BTreeMap<String, R>>,
    properties: RwLock<BTreeMap<(String, String), String>>,
    calls: Mutex<Vec<EdgeCall>>,
    updates: Mutex<Vec<R>>,
    failures: Mutex<HashMap<MockOp, EdgeError>>,
    unreachable: AtomicBool,
    next_id: AtomicU64,
}

impl<R: Resource> MockEdgeClient<R> {
    /// Creates an empty platform whose records are placed in `placement`.
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            objects: RwLock::new(BTreeMap::new()),
            properties: RwLock::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            unreachable: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
        }
    }

    /// Adds an object as if created out-of-band. Returns its id.
    pub fn insert(&self, edge_name: &str, mut record: R) -> String {
        let id = self.allocate_id();
        record.mark_synced(id.clone());
        self.objects.write().insert(edge_name.to_string(), record);
        id
    }

    /// Removes an object as if deleted out-of-band.
    pub fn remove(&self, edge_name: &str) -> Option<R> {
        self.objects.write().remove(edge_name)
    }

    /// Returns true if an object with this name exists.
    pub fn contains(&self, edge_name: &str) -> bool {
        self.objects.read().contains_key(edge_name)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if there are no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Sets a device property value.
    pub fn set_property(&self, device: &str, property: &str, value: &str) {
        self.properties
            .write()
            .insert((device.to_string(), property.to_string()), value.to_string());
    }

    /// Reads a device property value.
    pub fn property(&self, device: &str, property: &str) -> Option<String> {
        self.properties
            .read()
            .get(&(device.to_string(), property.to_string()))
            .cloned()
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: MockOp, error: EdgeError) {
        self.failures.lock().insert(op, error);
    }

    /// Makes every call fail as unreachable until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// All calls so far.
    pub fn calls(&self) -> Vec<EdgeCall> {
        self.calls.lock().clone()
    }

    /// Records passed to `update`, in order.
    pub fn updates(&self) -> Vec<R> {
        self.updates.lock().clone()
    }

    /// Counts calls matching a predicate.
    pub fn count_calls(&self, predicate: impl Fn(&EdgeCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
        self.updates.lock().clear();
    }

    fn allocate_id(&self) -> String {
        format!("edge-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn enter(&self, op: MockOp, call: EdgeCall) -> EdgeResult<()> {
        self.calls.lock().push(call);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EdgeError::Unreachable("connection refused".into()));
        }
        match self.failures.lock().remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Renders a stored object the way a real client would return it.
    fn to_local(&self, edge_name: &str, stored: &R) -> R {
        let mut record = stored.clone();
        let meta = record.meta_mut();
        meta.name = local_name(&self.placement.node_pool, edge_name);
        meta.namespace = self.placement.namespace.clone();
        meta.labels
            .insert(EDGE_OBJECT_NAME_LABEL.to_string(), edge_name.to_string());
        meta.resource_version = None;
        meta.uid = None;
        meta.finalizers.clear();
        meta.deletion_timestamp = None;
        record.set_node_pool(&self.placement.node_pool);
        record
    }
}

#[async_trait]
impl<R: Resource> EdgeClient<R> for MockEdgeClient<R> {
    async fn create(&self, record: &R) -> EdgeResult<String> {
        let name = edge_name(record).to_string();
        self.enter(MockOp::Create, EdgeCall::Create(name.clone()))?;
        if self.contains(&name) {
            return Err(EdgeError::AlreadyExists(name));
        }
        Ok(self.insert(&name, record.clone()))
    }

    async fn delete(&self, edge_name: &str) -> EdgeResult<()> {
        self.enter(MockOp::Delete, EdgeCall::Delete(edge_name.to_string()))?;
        self.remove(edge_name)
            .map(|_| ())
            .ok_or_else(|| EdgeError::NotFound(edge_name.to_string()))
    }

    async fn update(&self, record: &R) -> EdgeResult<Option<R>> {
        let name = edge_name(record).to_string();
        self.enter(MockOp::Update, EdgeCall::Update(name.clone()))?;
        if !self.contains(&name) {
            return Err(EdgeError::NotFound(name));
        }
        self.updates.lock().push(record.clone());
        Ok(Some(record.clone()))
    }

    async fn get(&self, edge_name: &str) -> EdgeResult<R> {
        self.enter(MockOp::Get, EdgeCall::Get(edge_name.to_string()))?;
        self.objects
            .read()
            .get(edge_name)
            .map(|stored| self.to_local(edge_name, stored))
            .ok_or_else(|| EdgeError::NotFound(edge_name.to_string()))
    }

    async fn list(&self, options: &EdgeListOptions) -> EdgeResult<Vec<R>> {
        self.enter(MockOp::List, EdgeCall::List)?;
        if options.label.is_some() {
            return Err(EdgeError::InvalidRequest(
                "label filters are not supported by the mock".into(),
            ));
        }
        Ok(self
            .objects
            .read()
            .iter()
            .map(|(name, stored)| self.to_local(name, stored))
            .collect())
    }
}

#[async_trait]
impl DevicePropertyClient for MockEdgeClient<Device> {
    async fn get_property_state(
        &self,
        property: &str,
        device: &Device,
    ) -> EdgeResult<ActualPropertyState> {
        let name = edge_name(device).to_string();
        self.enter(
            MockOp::GetProperty,
            EdgeCall::GetProperty {
                device: name.clone(),
                property: property.to_string(),
            },
        )?;
        let value = self
            .property(&name, property)
            .ok_or_else(|| EdgeError::PropertyNotFound {
                device: name.clone(),
                property: property.to_string(),
            })?;
        Ok(ActualPropertyState {
            name: property.to_string(),
            get_url: format!("mock://{name}/{property}"),
            actual_value: value,
        })
    }

    async fn update_property_state(
        &self,
        desired: &DesiredPropertyState,
        device: &Device,
    ) -> EdgeResult<()> {
        let name = edge_name(device).to_string();
        self.enter(
            MockOp::UpdateProperty,
            EdgeCall::UpdateProperty {
                device: name.clone(),
                property: desired.name.clone(),
                value: desired.desired_value.clone(),
            },
        )?;
        self.set_property(&name, &desired.name, &desired.desired_value);
        Ok(())
    }

    async fn list_properties_state(&self, device: &Device) -> EdgeResult<PropertyStates> {
        let name = edge_name(device).to_string();
        self.calls.lock().push(EdgeCall::ListProperties(name.clone()));
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EdgeError::Unreachable("connection refused".into()));
        }

        let mut desired = BTreeMap::new();
        let mut actual = BTreeMap::new();
        for ((dev, prop), value) in self.properties.read().iter() {
            if dev != &name {
                continue;
            }
            desired.insert(
                prop.clone(),
                DesiredPropertyState {
                    name: prop.clone(),
                    put_url: format!("mock://{name}/{prop}"),
                    desired_value: String::new(),
                },
            );
            actual.insert(
                prop.clone(),
                ActualPropertyState {
                    name: prop.clone(),
                    get_url: format!("mock://{name}/{prop}"),
                    actual_value: value.clone(),
                },
            );
        }
        Ok((desired, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_twice_reports_already_exists() {
        let edge = MockEdgeClient::<Device>::new(Placement::new("default", "p"));
        let device = Device::new("default", "lamp");
        let id = EdgeClient::create(&edge, &device).await.unwrap();
        assert_eq!(id, "edge-1");
        let err = EdgeClient::create(&edge, &device).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn get_returns_local_form() {
        let edge = MockEdgeClient::<Device>::new(Placement::new("default", "p"));
        edge.insert("Sensor-1", Device::new("", "Sensor-1"));
        let device = EdgeClient::get(&edge, "Sensor-1").await.unwrap();
        assert_eq!(device.metadata.name, "p-sensor-1");
        assert_eq!(device.spec.node_pool, "p");
        assert!(device.status.synced);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let edge = MockEdgeClient::<Device>::new(Placement::default());
        edge.fail_next(MockOp::List, EdgeError::Unreachable("down".into()));
        assert!(EdgeClient::list(&edge, &EdgeListOptions::all()).await.is_err());
        assert!(EdgeClient::list(&edge, &EdgeListOptions::all()).await.is_ok());
        assert_eq!(edge.count_calls(|c| *c == EdgeCall::List), 2);
    }
}
