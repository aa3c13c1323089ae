//! API configuration.
//!
//! Configures the HTTP listen address; the beacon side of the service is
//! taken from `beacon_metrics::CollectorConfig::from_env()`.

use std::net::SocketAddr;

/// Configuration for the metrics API HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // Bind to all interfaces so a containerised harness can reach it.
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

impl ApiConfig {
    /// Reads `API_LISTEN_ADDR`, falling back to the default address.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("API_LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .map(|listen_addr| Self { listen_addr })
                .map_err(|e| format!("API_LISTEN_ADDR={raw:?}: {e}")),
            Err(_) => Ok(Self::default()),
        }
    }
}
