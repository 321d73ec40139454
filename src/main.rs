//! Subscription merger service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 SUBSCRIPTION MERGER              │
//!                      │                                                  │
//!  GET /subs/{token}   │  ┌─────────┐   ┌─────────┐   ┌──────────────┐    │
//!  ────────────────────┼─▶│  http   │──▶│  store  │──▶│ ConfigMerger │    │
//!                      │  │ server  │   │ (token, │   │  (fan-out)   │    │
//!                      │  └─────────┘   │ sources)│   └──────┬───────┘    │
//!                      │                └─────────┘          │            │
//!                      │                        ┌────────────┼─────────┐  │
//!                      │                        ▼            ▼         ▼  │   Subscription
//!                      │                 SourceFetcher SourceFetcher ...  ─┼──▶ providers
//!                      │                        │            │         │  │
//!                      │                        └────────────┼─────────┘  │
//!                      │                                     ▼            │
//!  YAML profile        │  ┌─────────┐                ┌──────────────┐     │
//!  ◀───────────────────┼──│response │◀───────────────│ serializer   │     │
//!                      │  └─────────┘                └──────────────┘     │
//!                      └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use subs_merger::config::{load_config, watcher::ConfigWatcher, ServiceConfig};
use subs_merger::http::HttpServer;
use subs_merger::lifecycle::{signals, startup, Shutdown};
use subs_merger::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "subs-merger")]
#[command(about = "Merge Clash subscriptions into one profile", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and apply changes without restarting.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("subs-merger v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.backend,
        max_concurrency = config.fetch.max_concurrency,
        fetch_timeout_secs = config.fetch.timeout_secs,
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

    let store = startup::open_store(&config.store)?;

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        _ => {
            let (_, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let server = HttpServer::new(config, store)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
