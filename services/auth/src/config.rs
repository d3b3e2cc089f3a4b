//! Server configuration

use anyhow::Result;
use std::net::SocketAddr;

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_BIND_ADDRESS`: Listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("AUTH_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid AUTH_BIND_ADDRESS {}: {}", raw, e))?;

        Ok(ServerConfig { bind_address })
    }
}
