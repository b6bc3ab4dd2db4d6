use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Connection settings for an IPFS daemon.
///
/// Missing keys in a TOML file fall back to the defaults, so an empty file
/// is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout_secs: u64,
    /// Wrap the daemon store in a [`CachedStore`](crate::CachedStore).
    pub cache: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5001,
            timeout_secs: 10,
            cache: true,
        }
    }
}

impl StoreConfig {
    /// Base URL of the daemon's RPC API.
    pub fn api_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn from_toml_str(raw: &str) -> StoreResult<Self> {
        toml::from_str(raw).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
