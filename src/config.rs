//! Application configuration management.
//!
//! Stores the backend host and the last used username at
//! `~/.config/sensordeck/config.json`. The host can also come from the
//! `SENSORDECK_HOST` environment variable, which takes precedence.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sensordeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured host
const HOST_ENV_VAR: &str = "SENSORDECK_HOST";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub host: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The backend base URL, environment override first
    pub fn resolved_host(&self) -> Result<String> {
        if let Ok(host) = std::env::var(HOST_ENV_VAR) {
            if !host.is_empty() {
                return Ok(host);
            }
        }
        self.host.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No backend host configured. Run 'sensordeck config set-host <url>' or set {}",
                HOST_ENV_VAR
            )
        })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
