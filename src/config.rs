//! Configuration for the SUDEPmonitor toolkit.

use crate::core::windowing::ZeroDispersionPolicy;
use crate::core::{
    DEFAULT_CSI_WINDOW, DEFAULT_THRESHOLD, DEFAULT_VARIANCE_WINDOW, DEFAULT_WINDOW_SECONDS,
};
use crate::remote::{RemoteConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote database
    pub base_url: String,

    /// Per-request timeout
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Directory holding cached user records
    pub cache_dir: PathBuf,

    /// CSI window (beats)
    pub csi_window: usize,

    /// Window for accelerometer variance statistics (samples)
    pub variance_window: usize,

    /// Movement detection window (seconds)
    pub detection_seconds: f64,

    /// Movement detection variance threshold (G²)
    pub variance_threshold: f64,

    /// How CSI treats windows with zero SD1
    pub zero_dispersion: ZeroDispersionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sudep-monitor");

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            cache_dir: data_dir.join("Users"),
            csi_window: DEFAULT_CSI_WINDOW,
            variance_window: DEFAULT_VARIANCE_WINDOW,
            detection_seconds: DEFAULT_WINDOW_SECONDS,
            variance_threshold: DEFAULT_THRESHOLD,
            zero_dispersion: ZeroDispersionPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when it does
    /// not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration to the default location.
    ///
    /// Used by `config --init`.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sudep-monitor")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }

    /// Remote store settings.
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::new(self.base_url.clone(), self.request_timeout)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
