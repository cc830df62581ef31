//! Configuration for the Pearl exporter.

use pearl_device::DeviceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Longest accepted device timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Paths served by the exporter regardless of configuration.
const RESERVED_PATHS: [&str; 2] = ["/", "/health"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Device connection settings.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Metric naming.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:9115").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for the probe endpoint (default: "/probe").
    #[serde(default = "default_probe_path")]
    pub probe_path: String,

    /// Path for the exporter's own metrics (default: "/metrics").
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Subtracted from the scraper's advertised timeout so the answer
    /// arrives before the scraper gives up (seconds).
    #[serde(default = "default_timeout_offset")]
    pub timeout_offset_secs: f64,
}

fn default_listen() -> String {
    "0.0.0.0:9115".to_string()
}

fn default_probe_path() -> String {
    "/probe".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_timeout_offset() -> f64 {
    0.5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            probe_path: default_probe_path(),
            metrics_path: default_metrics_path(),
            timeout_offset_secs: default_timeout_offset(),
        }
    }
}

/// Metric naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prefix of every probe metric (default: "pearl").
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "pearl".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.server.listen
            )));
        }

        for (name, path) in [
            ("probe_path", &self.server.probe_path),
            ("metrics_path", &self.server.metrics_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{} must start with /",
                    name
                )));
            }
            if RESERVED_PATHS.contains(&path.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{} cannot be {}, which is already served",
                    name, path
                )));
            }
        }

        if self.server.probe_path == self.server.metrics_path {
            return Err(ConfigError::Validation(
                "probe_path and metrics_path must differ".to_string(),
            ));
        }

        if !self.server.timeout_offset_secs.is_finite() || self.server.timeout_offset_secs < 0.0
        {
            return Err(ConfigError::Validation(
                "timeout_offset_secs must be >= 0".to_string(),
            ));
        }

        if self.device.timeout_secs == 0 || self.device.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "device timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }

        for (endpoint, path) in self.device.endpoints.iter() {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Endpoint path for {} must start with /",
                    endpoint
                )));
            }
        }

        let namespace = &self.metrics.namespace;
        let valid_namespace = namespace
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_alphabetic() || c == '_')
            && namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_namespace {
            return Err(ConfigError::Validation(format!(
                "Invalid metric namespace: {}",
                namespace
            )));
        }

        Ok(())
    }
}
