//! Application configuration management.
//!
//! Holds the API location, cache and sync tuning, and the last signed-in
//! principal. Stored at `~/.config/guidesync/config.json`; environment
//! variables override the API URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::cache::MAX_TTL_MINUTES;
use crate::sync::coordinator::DEFAULT_STALENESS_HOURS;
use crate::sync::SyncSettings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "guidesync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `api_base_url`
pub const ENV_API_URL: &str = "GUIDESYNC_API_URL";

/// Bearer token supplied from the environment
pub const ENV_TOKEN: &str = "GUIDESYNC_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_CACHE_NAMESPACE: &str = "travel_app";
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 12 * 60;

/// Upper bound on `staleness_hours`: thirty days.
pub const MAX_STALENESS_HOURS: i64 = 30 * 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Path probed by the connectivity check, relative to `api_base_url`.
    pub health_path: String,
    pub cache_namespace: String,
    pub cache_ttl_minutes: i64,
    pub sync_interval_secs: u64,
    pub settle_delay_ms: u64,
    pub staleness_hours: i64,
    pub request_timeout_secs: u64,
    pub last_principal: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            health_path: "/guides/mes-guides".to_string(),
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            sync_interval_secs: 5 * 60,
            settle_delay_ms: 1000,
            staleness_hours: DEFAULT_STALENESS_HOURS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            last_principal: None,
        }
    }
}

impl Config {
    /// Load the saved config (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&contents).context("Failed to parse config file")
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

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.cache_ttl_minutes) {
            return Err(anyhow!(
                "cache_ttl_minutes must be between 1 and {}, got {}",
                MAX_TTL_MINUTES,
                self.cache_ttl_minutes
            ));
        }
        if !(1..=MAX_STALENESS_HOURS).contains(&self.staleness_hours) {
            return Err(anyhow!(
                "staleness_hours must be between 1 and {}, got {}",
                MAX_STALENESS_HOURS,
                self.staleness_hours
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(anyhow!("sync_interval_secs must be positive"));
        }
        Ok(())
    }

    /// Directory holding the cache and pending-action queue.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn health_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.health_path
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sync timing. A staleness bound chrono cannot represent falls back to the default.
    pub fn sync_settings(&self) -> SyncSettings {
        let defaults = SyncSettings::default();
        SyncSettings {
            interval: Duration::from_secs(self.sync_interval_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            staleness: chrono::Duration::try_hours(self.staleness_hours)
                .unwrap_or(defaults.staleness),
        }
    }
}
