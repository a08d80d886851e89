//! Backpack Gateway
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                      GATEWAY                              │
//!   Client Request    │  ┌────────────┐   ┌─────┐   ┌─────────────┐   ┌───────┐  │
//!   ──────────────────┼─▶│ rate_limit │──▶│ waf │──▶│ idempotency │──▶│ cache │──┼──▶ Origin
//!                     │  └─────┬──────┘   └──┬──┘   └──────┬──────┘   └───┬───┘  │
//!   ◀─────────────────┼────────┴─── 429 ─────┴ 403   replay ┴      hit ────┘      │
//!                     │                                                          │
//!                     │  admin: /api/settings  /api/metrics                      │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use backpack_gateway::config::settings::parse_origin;
use backpack_gateway::config::{load_config, validate_config, ConfigError, ConfigWatcher, GatewayConfig};
use backpack_gateway::lifecycle::{wait_for_signal, Shutdown};
use backpack_gateway::observability::{logging, metrics};
use backpack_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Protective reverse proxy", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override policies.target_backend_url
    #[arg(short, long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(origin) = args.origin {
        config.policies.target_backend_url = parse_origin(&origin)?;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "backpack-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.policies.target_backend_url,
        rate_limit_per_minute = config.policies.rate_limit_per_minute,
        cache_ttl_secs = config.cache.ttl_secs,
        cache_capacity = config.cache.capacity,
        idempotency_ttl_secs = config.idempotency.ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.trigger();
        }
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
