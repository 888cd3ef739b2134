//! Run command implementation.

use devicesync_engine::SyncEngine;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runs the engine until interrupted.
pub async fn run(engine: SyncEngine) -> Result<(), Box<dyn std::error::Error>> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, stopping"),
            Err(e) => warn!(error = %e, "cannot listen for interrupt, stopping"),
        }
        // The receiver is gone only if the engine already stopped.
        let _ = stop_tx.send(true);
    });

    engine.run(stop_rx).await;
    signal.abort();
    Ok(())
}
