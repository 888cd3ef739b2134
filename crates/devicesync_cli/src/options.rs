//! Engine flags and their validation.

use clap::Args;
use devicesync_edge::{validate_address, EdgeConfig};
use devicesync_engine::{ControllerConfig, EngineConfig, SyncerConfig, MIN_SYNC_INTERVAL};
use thiserror::Error;

/// Rejected command-line settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No pool was given.
    #[error("--nodepool must not be empty")]
    MissingNodePool,

    /// An edge service address is not `host:port`.
    #[error("--{flag}: {reason}")]
    InvalidAddress {
        /// Offending flag.
        flag: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The sync period is below the minimum.
    #[error("--edge-sync-period must be at least {min} seconds, got {got}")]
    SyncPeriodTooShort {
        /// Requested seconds.
        got: u64,
        /// Minimum seconds.
        min: u64,
    },

    /// Zero workers were requested.
    #[error("--workers must be at least 1")]
    NoWorkers,
}

/// Flags shared by every command.
#[derive(Debug, Clone, Args)]
pub struct EngineOptions {
    /// Pool whose records this process owns
    #[arg(long, default_value = "")]
    pub nodepool: String,

    /// Store namespace for records mirrored from the edge
    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// host:port of the edge core-data service
    #[arg(long, default_value = "edgex-core-data:48080")]
    pub core_data_address: String,

    /// host:port of the edge core-metadata service
    #[arg(long, default_value = "edgex-core-metadata:48081")]
    pub core_metadata_address: String,

    /// host:port of the edge core-command service
    #[arg(long, default_value = "edgex-core-command:48082")]
    pub core_command_address: String,

    /// Seconds between full sync rounds (minimum 5)
    #[arg(long, default_value_t = 5)]
    pub edge_sync_period: u64,

    /// Concurrent reconcile workers per kind
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
}

impl EngineOptions {
    /// Checks the flags and builds engine and edge settings from them.
    ///
    /// # Errors
    ///
    /// Returns the first invalid flag.
    pub fn validate(&self) -> Result<(EngineConfig, EdgeConfig), ConfigError> {
        if self.nodepool.trim().is_empty() {
            return Err(ConfigError::MissingNodePool);
        }
        for (flag, address) in [
            ("core-data-address", &self.core_data_address),
            ("core-metadata-address", &self.core_metadata_address),
            ("core-command-address", &self.core_command_address),
        ] {
            validate_address(address)
                .map_err(|reason| ConfigError::InvalidAddress { flag, reason })?;
        }
        let min = MIN_SYNC_INTERVAL.as_secs();
        if self.edge_sync_period < min {
            return Err(ConfigError::SyncPeriodTooShort {
                got: self.edge_sync_period,
                min,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let engine = EngineConfig::new(self.nodepool.trim())
            .with_namespace(self.namespace.clone())
            .with_syncer(SyncerConfig::from_secs(self.edge_sync_period))
            .with_controller(ControllerConfig::new(self.workers));
        let edge = EdgeConfig::new()
            .with_core_data(self.core_data_address.clone())
            .with_core_metadata(self.core_metadata_address.clone())
            .with_core_command(self.core_command_address.clone());
        Ok((engine, edge))
    }
}
