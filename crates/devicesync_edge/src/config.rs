//! Edge platform connection settings.

use std::time::Duration;

/// Addresses of the edge platform services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    /// `host:port` of core-data.
    pub core_data_address: String,
    /// `host:port` of core-metadata.
    pub core_metadata_address: String,
    /// `host:port` of core-command.
    pub core_command_address: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl EdgeConfig {
    /// Creates a configuration with the default service addresses.
    pub fn new() -> Self {
        Self {
            core_data_address: "edgex-core-data:48080".to_string(),
            core_metadata_address: "edgex-core-metadata:48081".to_string(),
            core_command_address: "edgex-core-command:48082".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the core-data address.
    pub fn with_core_data(mut self, address: impl Into<String>) -> Self {
        self.core_data_address = address.into();
        self
    }

    /// Sets the core-metadata address.
    pub fn with_core_metadata(mut self, address: impl Into<String>) -> Self {
        self.core_metadata_address = address.into();
        self
    }

    /// Sets the core-command address.
    pub fn with_core_command(mut self, address: impl Into<String>) -> Self {
        self.core_command_address = address.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks every address.
    ///
    /// # Errors
    ///
    /// Returns the first invalid address and why.
    pub fn validate(&self) -> Result<(), String> {
        for (service, address) in [
            ("core-data", &self.core_data_address),
            ("core-metadata", &self.core_metadata_address),
            ("core-command", &self.core_command_address),
        ] {
            validate_address(address).map_err(|e| format!("{service} address: {e}"))?;
        }
        Ok(())
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `address` is `host:port` with a non-empty host and numeric port.
///
/// # Errors
///
/// Returns a description of the problem.
pub fn validate_address(address: &str) -> Result<(), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("{address:?} is not in host:port form"))?;
    if host.is_empty() {
        return Err(format!("{address:?} has an empty host"));
    }
    port.parse::<u16>()
        .map_err(|_| format!("{address:?} has an invalid port {port:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EdgeConfig::default().validate().is_ok());
    }

    #[test]
    fn address_validation() {
        assert!(validate_address("10.0.0.1:48081").is_ok());
        assert!(validate_address("edgex-core-data:48080").is_ok());
        assert!(validate_address("no-port").is_err());
        assert!(validate_address(":48080").is_err());
        assert!(validate_address("host:http").is_err());

        let err = EdgeConfig::new()
            .with_core_command("bad")
            .validate()
            .unwrap_err();
        assert!(err.starts_with("core-command"));
    }
}
