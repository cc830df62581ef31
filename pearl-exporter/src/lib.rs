//! Pearl Exporter
//!
//! Prometheus probe exporter for Epiphan Pearl devices. Every request to the
//! probe endpoint queries one device and answers with a fresh set of metrics;
//! nothing is cached between scrapes.
//!
//! - [`probe`] - Concurrent endpoint queries under a per-request deadline
//! - [`mapping`] - Probe results to metric families
//! - [`exposition`] - Text exposition of a metric snapshot
//! - [`http`] - HTTP server (probe, metrics, health)
//! - [`config`] - Exporter configuration (JSON5 format)

pub mod config;
pub mod exposition;
pub mod http;
pub mod mapping;
pub mod probe;

pub use config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
pub use exposition::encode;
pub use http::HttpServer;
pub use mapping::{MetricSnapshot, map_probe};
pub use probe::{ProbeOptions, ProbeResult, Prober};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
    }

    Ok(())
}
