use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::account::LatencyPolicy;
use crate::error::ConfigError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per slot inside `path`
    File,
    /// Embedded sled database at `path`
    Sled,
    /// Process memory only, nothing survives a restart
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuthConfig {
    /// Artificial delay before register/login complete, in milliseconds
    pub latency_ms: u64,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    #[serde(default)]
    pub hash_passwords: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_key_prefix() -> String {
    "animeplay_".to_string()
}

fn default_min_password_len() -> usize {
    6
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig {
                backend: StorageBackend::File,
                path: "./data/storage".to_string(),
                key_prefix: default_key_prefix(),
            },
            auth: AuthConfig {
                latency_ms: 600,
                min_password_len: default_min_password_len(),
                hash_passwords: false,
            },
        }
    }
}

impl AuthConfig {
    pub fn latency(&self) -> LatencyPolicy {
        if self.latency_ms == 0 {
            LatencyPolicy::None
        } else {
            LatencyPolicy::Fixed(Duration::from_millis(self.latency_ms))
        }
    }
}

impl AppConfig {
    /// Parse the file at `path`. `Ok(None)` when it does not exist.
    pub fn load(path: &str) -> Result<Option<Self>, ConfigError> {
        if !Path::new(path).exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&raw)?))
    }

    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(Some(config)) => {
                info!("Config loaded from {}", path);
                config
            }
            Ok(None) => {
                info!("Config file not found at '{}'. Creating default.", path);
                let config = Self::default();
                if let Ok(s) = toml::to_string_pretty(&config) {
                    if let Err(e) = std::fs::write(path, s) {
                        warn!("Could not write default config to '{}': {}", path, e);
                    }
                }
                config
            }
            Err(e) => {
                warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }
}
