//! Configuration loading for the admin core.
//!
//! Config lives at `~/.civiops/config.json` (camelCase JSON, every field
//! defaulted except the backend block). `CIVIOPS_BACKEND_URL` and
//! `CIVIOPS_BACKEND_KEY` override the file so containerized deployments
//! can skip it entirely. Validation happens at load time: a missing or
//! malformed backend URL/key is a hard configuration error, not a map
//! that silently never loads.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Hosted backend endpoint and key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    /// Anon/service key sent as both `apikey` and bearer token.
    #[serde(default)]
    pub key: String,
}

/// Initial map viewport handed to the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

// Delhi/NCR, matching the deployment this was built for.
fn default_center_lat() -> f64 {
    28.6139
}
fn default_center_lng() -> f64 {
    77.209
}
fn default_zoom() -> u8 {
    11
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reconnect backoff cap, seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backoff_secs: default_max_backoff(),
        }
    }
}

/// Canonical config file path (`~/.civiops/config.json`).
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".civiops").join("config.json"))
}

/// Load configuration: file first, then env overrides, then validation.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;
    let mut config = if path.exists() {
        let content =
            fs::read_to_string(&path).map_err(|e| format!("Failed to read config: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?
    } else {
        Config {
            backend: BackendConfig::default(),
            map: MapConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    };

    apply_env_overrides(&mut config);

    config
        .backend
        .validate()
        .map_err(|e| format!("{} (set backend.url/backend.key in {} or CIVIOPS_BACKEND_URL/CIVIOPS_BACKEND_KEY)", e, path.display()))?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var("CIVIOPS_BACKEND_URL") {
        if !url.is_empty() {
            config.backend.url = url;
        }
    }
    if let Ok(key) = std::env::var("CIVIOPS_BACKEND_KEY") {
        if !key.is_empty() {
            config.backend.key = key;
        }
    }
}

impl BackendConfig {
    /// Reject unusable endpoint configuration up front.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.url.is_empty() {
            return Err(BackendError::Config("missing backend URL".into()));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(BackendError::Config(format!(
                "backend URL must be http(s): {}",
                self.url
            )));
        }
        if self.key.is_empty() {
            return Err(BackendError::Config("missing backend key".into()));
        }
        Ok(())
    }
}
