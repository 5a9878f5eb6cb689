//! Configuration types for the image editing workflow

use crate::error::{BackZapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default removal timeout (30 seconds)
pub const DEFAULT_REMOVAL_TIMEOUT_MS: u64 = 30_000;

/// Delay of the simulated remover (2 seconds)
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 2_000;

/// Application data directory (`<data_dir>/backzap`)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backzap")
}

/// Application config directory (`<config_dir>/backzap`)
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backzap")
}

/// Configuration for the workflow controller and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Timeout for a single removal call in milliseconds (`None` = no timeout)
    pub removal_timeout_ms: Option<u64>,

    /// Fixed delay of the simulated removal service in milliseconds
    pub simulated_delay_ms: u64,

    /// Endpoint of a remote removal service (`None` = simulated service)
    pub remote_endpoint: Option<String>,

    /// Where the simulated service writes processed PNGs (`None` = no files)
    pub output_dir: Option<PathBuf>,

    /// Destination of "download to device" exports
    pub downloads_dir: PathBuf,

    /// Outbox that share targets pick exported images up from
    pub share_dir: PathBuf,

    /// Results library file
    pub library_path: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            removal_timeout_ms: Some(DEFAULT_REMOVAL_TIMEOUT_MS),
            simulated_delay_ms: DEFAULT_SIMULATED_DELAY_MS,
            remote_endpoint: None,
            output_dir: None,
            downloads_dir: dirs::download_dir().unwrap_or_else(|| data_dir.join("downloads")),
            share_dir: data_dir.join("share-outbox"),
            library_path: data_dir.join("library.json"),
        }
    }
}

impl WorkflowConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }

    #[must_use]
    pub fn removal_timeout(&self) -> Option<Duration> {
        self.removal_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Removal timeout, when set, must be greater than zero
    /// - Remote endpoint, when set, must be an http(s) URL
    ///
    /// # Errors
    /// - `BackZapError::InvalidConfig` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.removal_timeout_ms == Some(0) {
            return Err(BackZapError::config_value_error(
                "removal timeout (ms)",
                0,
                "> 0",
                Some(DEFAULT_REMOVAL_TIMEOUT_MS),
            ));
        }

        if let Some(endpoint) = &self.remote_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(BackZapError::invalid_config(format!(
                    "Remote endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from a JSON file; missing keys take their defaults
    ///
    /// # Errors
    /// - File read failures
    /// - Malformed JSON
    /// - Validation failures
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackZapError::file_io_error("read config", path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    ///
    /// # Errors
    /// - Directory creation or write failures
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BackZapError::file_io_error("create config directory", parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| BackZapError::file_io_error("write config", path, e))
    }
}

/// Builder for `WorkflowConfig`
#[derive(Debug, Default)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    /// Set the removal timeout (`None` disables it)
    #[must_use]
    pub fn removal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.removal_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Set the simulated service delay
    #[must_use]
    pub fn simulated_delay(mut self, delay: Duration) -> Self {
        self.config.simulated_delay_ms = delay.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn remote_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.remote_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn downloads_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.downloads_dir = dir.into();
        self
    }

    #[must_use]
    pub fn share_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.share_dir = dir.into();
        self
    }

    #[must_use]
    pub fn library_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.library_path = path.into();
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Validation failures (see [`WorkflowConfig::validate`])
    pub fn build(self) -> Result<WorkflowConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
