//! The composite engine: a controller and a syncer for every kind.

use crate::config::EngineConfig;
use crate::controller::Controller;
use crate::error::EngineResult;
use crate::reconciler::{
    DeviceManagedState, DeviceProfileManagedState, DeviceServiceManagedState, ManagedState,
    RecordReconciler,
};
use crate::refresh::{
    DeviceProfileStatusRefresh, DeviceServiceStatusRefresh, DeviceStatusRefresh, StatusRefresh,
};
use crate::syncer::{SyncRoundReport, Syncer};
use devicesync_api::{Device, DeviceProfile, DeviceService, Resource};
use devicesync_edge::{DevicePropertyClient, EdgeClient};
use devicesync_store::RecordStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Local store handles, one per kind.
#[derive(Clone)]
pub struct Stores {
    /// Device records.
    pub devices: Arc<dyn RecordStore<Device>>,
    /// Device-service records.
    pub device_services: Arc<dyn RecordStore<DeviceService>>,
    /// Device-profile records.
    pub device_profiles: Arc<dyn RecordStore<DeviceProfile>>,
}

/// Edge platform clients, one per kind plus device properties.
#[derive(Clone)]
pub struct EdgeClients {
    /// Device client.
    pub devices: Arc<dyn EdgeClient<Device>>,
    /// Device property client.
    pub properties: Arc<dyn DevicePropertyClient>,
    /// Device-service client.
    pub device_services: Arc<dyn EdgeClient<DeviceService>>,
    /// Device-profile client.
    pub device_profiles: Arc<dyn EdgeClient<DeviceProfile>>,
}

struct KindRuntime<R: Resource> {
    controller: Arc<Controller<RecordReconciler<R>>>,
    syncer: Arc<Syncer<R>>,
}

impl<R: Resource> KindRuntime<R> {
    fn new(
        config: &EngineConfig,
        store: Arc<dyn RecordStore<R>>,
        edge: Arc<dyn EdgeClient<R>>,
        managed: Arc<dyn ManagedState<R>>,
        refresh: Arc<dyn StatusRefresh<R>>,
    ) -> Self {
        let reconciler = Arc::new(RecordReconciler::new(
            store.clone(),
            edge.clone(),
            managed,
            config.node_pool.clone(),
        ));
        let controller = Arc::new(Controller::new(
            reconciler,
            store.clone(),
            config.controller.clone(),
        ));
        let syncer = Arc::new(Syncer::new(
            store,
            edge,
            refresh,
            config.node_pool.clone(),
            config.namespace.clone(),
            config.syncer.clone(),
        ));
        Self { controller, syncer }
    }

    fn spawn(&self, stop: &watch::Receiver<bool>) -> [tokio::task::JoinHandle<()>; 2] {
        let controller = self.controller.clone();
        let controller_stop = stop.clone();
        let syncer = self.syncer.clone();
        let syncer_stop = stop.clone();
        [
            tokio::spawn(async move { controller.run(controller_stop).await }),
            tokio::spawn(async move { syncer.run(syncer_stop).await }),
        ]
    }
}

/// Runs both synchronization directions for devices, device services, and
/// device profiles within one pool.
pub struct SyncEngine {
    config: EngineConfig,
    devices: KindRuntime<Device>,
    device_services: KindRuntime<DeviceService>,
    device_profiles: KindRuntime<DeviceProfile>,
}

impl SyncEngine {
    /// Wires reconcilers, controllers, and syncers for every kind.
    pub fn new(config: EngineConfig, stores: Stores, edge: EdgeClients) -> Self {
        let devices = KindRuntime::new(
            &config,
            stores.devices,
            edge.devices.clone(),
            Arc::new(DeviceManagedState::new(edge.devices, edge.properties.clone())),
            Arc::new(DeviceStatusRefresh::new(edge.properties)),
        );
        let device_services = KindRuntime::new(
            &config,
            stores.device_services,
            edge.device_services.clone(),
            Arc::new(DeviceServiceManagedState::new(edge.device_services)),
            Arc::new(DeviceServiceStatusRefresh),
        );
        let device_profiles = KindRuntime::new(
            &config,
            stores.device_profiles,
            edge.device_profiles,
            Arc::new(DeviceProfileManagedState),
            Arc::new(DeviceProfileStatusRefresh),
        );
        Self {
            config,
            devices,
            device_services,
            device_profiles,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one sync round per kind: profiles, then services, then devices.
    ///
    /// # Errors
    ///
    /// Returns the first round that failed to list; earlier rounds have
    /// already been applied.
    pub async fn sync_once(&self) -> EngineResult<Vec<SyncRoundReport>> {
        Ok(vec![
            self.device_profiles.syncer.sync_once().await?,
            self.device_services.syncer.sync_once().await?,
            self.devices.syncer.sync_once().await?,
        ])
    }

    /// Runs every controller and syncer until `stop` turns true.
    pub async fn run(&self, stop: watch::Receiver<bool>) {
        info!(
            node_pool = %self.config.node_pool,
            namespace = %self.config.namespace,
            "engine starting"
        );
        let mut handles = Vec::with_capacity(6);
        handles.extend(self.device_profiles.spawn(&stop));
        handles.extend(self.device_services.spawn(&stop));
        handles.extend(self.devices.spawn(&stop));

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "engine task panicked");
            }
        }
        info!("engine stopped");
    }
}
