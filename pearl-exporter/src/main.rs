//! Prometheus probe exporter for Epiphan Pearl devices.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pearl_device::DeviceClient;
use tokio::sync::watch;
use tracing::{error, info, warn};

use pearl_exporter::{ExporterConfig, HttpServer, Prober, init_tracing};

/// Prometheus probe exporter for Epiphan Pearl devices.
#[derive(Parser, Debug)]
#[command(name = "pearl-exporter")]
#[command(about = "Export Epiphan Pearl device status as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Accept invalid TLS certificates from devices.
    #[arg(long)]
    insecure_skip_verify: bool,

    /// Default device username.
    #[arg(long, env = "PEARL_USERNAME")]
    username: Option<String>,

    /// Default device password.
    #[arg(long, env = "PEARL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.insecure_skip_verify {
        config.device.insecure_skip_verify = true;
    }
    if args.username.is_some() {
        config.device.username = args.username;
    }
    if args.password.is_some() {
        config.device.password = args.password;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Pearl Exporter");
    if config.device.insecure_skip_verify {
        warn!("TLS certificate verification is disabled for device connections");
    }

    let listen_addr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let client = DeviceClient::new(&config.device)?;
    let prober = Arc::new(Prober::new(client, &config.device));
    let http_server = HttpServer::new(prober, Arc::new(config), listen_addr);

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    shutdown_tx.send(true)?;

    if tokio::time::timeout(Duration::from_secs(5), http_task)
        .await
        .is_err()
    {
        warn!("HTTP server did not stop in time");
    }

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
