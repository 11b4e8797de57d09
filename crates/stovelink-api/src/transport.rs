// Shared transport configuration for building reqwest::Client instances.
//
// The identity provider and the device API share timeout and user-agent
// settings through this module, avoiding duplicated builder logic.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("stovelink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
