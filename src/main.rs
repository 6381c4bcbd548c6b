//! Socksrelay - SOCKS5 proxy server
//!
//! This is the main entry point for the Socksrelay application.

use anyhow::{Context, Result};
use clap::Parser;
use socksrelay::config::{load_config, Config};
use socksrelay::Proxy;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Socksrelay - SOCKS5 proxy server with pluggable connection handlers
#[derive(Parser, Debug)]
#[command(name = "socksrelay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the configuration file
    #[arg(long)]
    listen: Option<String>,

    /// Per-operation timeout in seconds, overrides the configuration file
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    let config = build_config(&args)?;

    info!("Socksrelay v{}", socksrelay::VERSION);
    if let Some(path) = &args.config {
        info!("Configuration loaded from: {:?}", path);
    }

    let mut proxy = Proxy::new(config.proxy_config()?);
    proxy.start().await?;

    wait_for_signal().await;

    proxy.stop();
    proxy.wait().await;
    Ok(())
}

/// Merge the configuration file with command-line overrides
fn build_config(args: &Args) -> Result<Config> {
    let mut config = match (&args.config, &args.listen) {
        (Some(path), _) => load_config(path)?,
        (None, Some(listen)) => Config::with_bind_addr(listen.clone()),
        (None, None) => anyhow::bail!("either --config or --listen is required"),
    };

    if let Some(listen) = &args.listen {
        config.server.bind_addr = listen.clone();
    }
    if let Some(timeout) = args.timeout {
        config.server.timeout = timeout;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Invalid configuration")?;
    Ok(config)
}

/// Wait for Ctrl+C or, on Unix, SIGTERM
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down...");
                    }
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to setup SIGTERM handler: {}", e),
        }
    }

    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C, shutting down...");
}

/// Setup logging based on configuration
///
/// `RUST_LOG`, when set, takes precedence over `--log-level`.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
