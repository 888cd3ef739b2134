//! CLI command implementations.

pub mod run;
pub mod sync_once;

use crate::options::EngineOptions;
use devicesync_edge::{EdgexClient, Placement, ReqwestClient};
use devicesync_engine::{EdgeClients, MemoryStores, SyncEngine};
use devicesync_store::Scheme;
use std::sync::Arc;
use tracing::info;

/// Validates the flags, checks the edge platform is up, and wires an engine
/// over in-memory stores.
pub async fn connect(options: &EngineOptions) -> Result<SyncEngine, Box<dyn std::error::Error>> {
    let (engine_config, edge_config) = options.validate()?;

    let http = ReqwestClient::new(edge_config.timeout)?;
    let placement = Placement::new(
        engine_config.namespace.clone(),
        engine_config.node_pool.clone(),
    );
    let client = Arc::new(EdgexClient::new(edge_config, placement, http));
    client
        .ping_all()
        .await
        .map_err(|e| format!("edge platform is not reachable: {e}"))?;
    info!("edge platform is reachable");

    let stores = MemoryStores::open(&Scheme::with_device_kinds())?;
    let edge = EdgeClients {
        devices: client.clone(),
        properties: client.clone(),
        device_services: client.clone(),
        device_profiles: client,
    };
    Ok(SyncEngine::new(engine_config, stores.stores(), edge))
}
