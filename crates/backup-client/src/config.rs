//! Export client configuration with YAML support

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number of poll ticks per minute of wall-clock budget
pub const TICKS_PER_MINUTE: u64 = 12;

/// Export client configuration
///
/// Can be loaded from YAML or JSON, or constructed programmatically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Polling and deadline settings
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// Flags sent with the job-start request
    #[serde(default)]
    pub trigger: TriggerOptions,
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Wall-clock budget for the remote export in minutes (default: 180)
    #[serde(default = "default_timeout_minutes")]
    pub export_minutes: u64,

    /// Interval between progress polls in milliseconds (default: 5s)
    #[serde(default = "default_poll_interval")]
    pub poll_ms: u64,

    /// Per-request timeout in milliseconds (default: HTTP client default)
    #[serde(default)]
    pub request_ms: Option<u64>,

    /// Connect timeout in milliseconds (default: HTTP client default)
    #[serde(default)]
    pub connect_ms: Option<u64>,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            export_minutes: default_timeout_minutes(),
            poll_ms: default_poll_interval(),
            request_ms: None,
            connect_ms: None,
        }
    }
}

impl TimeoutsConfig {
    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

fn default_timeout_minutes() -> u64 {
    180
}

fn default_poll_interval() -> u64 {
    60_000 / TICKS_PER_MINUTE // 5 seconds
}

/// Job-start flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerOptions {
    /// Include attachments in the export
    #[serde(default = "default_true")]
    pub include_attachments: bool,

    /// Ask the server to produce a cloud-importable export
    #[serde(default = "default_true")]
    pub export_to_cloud: bool,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            include_attachments: true,
            export_to_cloud: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ExportConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Create a builder for programmatic configuration
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::new()
    }
}

/// Builder for ExportConfig
#[derive(Debug, Default)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the export budget in minutes
    pub fn timeout_minutes(mut self, minutes: u64) -> Self {
        self.config.timeouts.export_minutes = minutes;
        self
    }

    /// Set the poll interval in milliseconds
    pub fn poll_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.poll_ms = ms;
        self
    }

    /// Set the per-request timeout in milliseconds
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.request_ms = Some(ms);
        self
    }

    /// Set the connect timeout in milliseconds
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.connect_ms = Some(ms);
        self
    }

    /// Include attachments in the export
    pub fn include_attachments(mut self, include: bool) -> Self {
        self.config.trigger.include_attachments = include;
        self
    }

    /// Request a cloud-importable export
    pub fn export_to_cloud(mut self, cloud: bool) -> Self {
        self.config.trigger.export_to_cloud = cloud;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ExportConfig {
        self.config
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
