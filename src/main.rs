//! vj-mirror: caching, rewriting mirror in front of a single upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                       MIRROR                         │
//!   Client        │  ┌──────────┐  HIT                                   │
//!   ──────────────┼─▶│ cache    │────────────────────────────┐          │
//!                 │  │ hit gate │                             │          │
//!                 │  └────┬─────┘                             │          │
//!                 │       │ MISS                              │          │
//!                 │       ▼                                   │          │
//!                 │  ┌──────────┐    ┌───────────┐            │          │
//!                 │  │ request  │───▶│ forwarder │────────────┼──────────┼──▶ Upstream
//!                 │  │sanitizer │    └─────┬─────┘            │          │
//!                 │  └──────────┘          ▼                  │          │
//!                 │                 ┌────────────┐   write    │          │
//!   ◀─────────────┼─────────────────│  response  │──────▶ cache store    │
//!                 │   LOST/BYPASS   │ processor  │                       │
//!                 │                 └────────────┘                       │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use vj_mirror::cache;
use vj_mirror::config::{load_config, load_env_file, validate_config, ConfigError, MirrorConfig};
use vj_mirror::lifecycle::{signals, Shutdown};
use vj_mirror::observability::{logging, metrics};
use vj_mirror::MirrorServer;

#[derive(Parser)]
#[command(name = "vj-mirror")]
#[command(about = "Caching, rewriting mirror in front of a single upstream site", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Public host of the mirror (overrides the config file).
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Listener address (overrides the config file).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // before parsing, so `HOST` from `.env` reaches `--host`
    let env_file = load_env_file(None);
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MirrorConfig::default(),
    };
    config.apply_env();
    if let Some(host) = cli.host {
        config.mirror.host = host;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("vj-mirror v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &env_file {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        host = %config.mirror.host,
        cache_backend = ?config.cache.backend,
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

    let store = cache::open_store(&config.cache).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = MirrorServer::builder(config).store(store).build()?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            signals::wait_for_shutdown().await;
            shutdown.trigger();
        }
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
