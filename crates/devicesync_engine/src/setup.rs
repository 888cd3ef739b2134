//! One-time store initialization.

use crate::engine::Stores;
use crate::error::EngineResult;
use devicesync_api::{Device, DeviceProfile, DeviceService, Resource};
use devicesync_store::{node_pool_indexer, InMemoryStore, Scheme, NODE_POOL_FIELD};
use std::sync::Arc;
use tracing::debug;

/// In-memory stores for every kind, with pool indexes registered.
#[derive(Clone)]
pub struct MemoryStores {
    /// Device records.
    pub devices: Arc<InMemoryStore<Device>>,
    /// Device-service records.
    pub device_services: Arc<InMemoryStore<DeviceService>>,
    /// Device-profile records.
    pub device_profiles: Arc<InMemoryStore<DeviceProfile>>,
}

impl MemoryStores {
    /// Opens stores for every kind in `scheme` and registers the pool index.
    ///
    /// Must run once, before any controller or syncer starts.
    ///
    /// # Errors
    ///
    /// Returns an error if a kind is not registered in `scheme`.
    pub fn open(scheme: &Scheme) -> EngineResult<Self> {
        Ok(Self {
            devices: open_indexed(scheme)?,
            device_services: open_indexed(scheme)?,
            device_profiles: open_indexed(scheme)?,
        })
    }

    /// Type-erased handles for the engine.
    pub fn stores(&self) -> Stores {
        Stores {
            devices: self.devices.clone(),
            device_services: self.device_services.clone(),
            device_profiles: self.device_profiles.clone(),
        }
    }
}

fn open_indexed<R: Resource>(scheme: &Scheme) -> EngineResult<Arc<InMemoryStore<R>>> {
    let store = InMemoryStore::new(scheme)?;
    store.register_field_index(NODE_POOL_FIELD, node_pool_indexer())?;
    debug!(kind = %R::KIND, field = NODE_POOL_FIELD, "field index registered");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::Kind;

    #[test]
    fn opens_indexed_stores() {
        let stores = MemoryStores::open(&Scheme::with_device_kinds()).unwrap();
        assert!(stores.devices.has_field_index(NODE_POOL_FIELD));
        assert!(stores.device_profiles.has_field_index(NODE_POOL_FIELD));
    }

    #[test]
    fn unregistered_kind_fails() {
        let scheme = Scheme::new().register(Kind::Device);
        assert!(MemoryStores::open(&scheme).is_err());
    }
}
