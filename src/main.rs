//! Session-validating reverse proxy (gateway binary).
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                 SESSION GATEWAY                   │
//!                    │                                                   │
//!   Client Request   │  ┌───────────┐   ┌─────────┐   ┌──────────────┐  │
//!   ─────────────────┼─▶│correlation│──▶│ metrics │──▶│   routing    │  │
//!                    │  └───────────┘   └─────────┘   └──────┬───────┘  │
//!                    │                                       │          │
//!                    │                                       ▼          │
//!                    │  ┌─────────────────────────────────────────────┐ │
//!                    │  │          session validation filter          │ │
//!                    │  │  token pre-parse → store lookup (breaker)   │ │
//!                    │  │  → HMAC verify → relationship/permissions   │ │
//!                    │  │  → allow-list rewrite + envelope injection  │ │
//!                    │  └──────────────────────┬──────────────────────┘ │
//!                    │                         │                        │
//!   Client Response  │  ┌─────────┐    ┌──────▼───────┐                │
//!   ◀────────────────┼──│  error  │◀───│   upstream   │◀───────────────┼──── Backend
//!                    │  │ mapper  │    │   dispatch   │                │     Service
//!                    │  └─────────┘    └──────────────┘                │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_gateway::config::{load_config, GatewayConfig};
use session_gateway::http::GatewayServer;
use session_gateway::lifecycle::Shutdown;
use session_gateway::observability::metrics;
use session_gateway::resilience::BreakerRegistry;
use session_gateway::session::{RedisBackend, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "session-gateway", about = "Session-validating reverse proxy")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("session_gateway={}", config.observability.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The blocking pool runs JSON decode and HMAC verification; cap
    // it explicitly so saturation shows up as latency, not threads.
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder
        .enable_all()
        .max_blocking_threads(config.runtime.blocking_pool_cap());
    if let Some(workers) = config.runtime.worker_threads {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    runtime.block_on(run(config))
}

async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "session-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr, &config.observability.service_name),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = BreakerRegistry::from_config(&config.breakers);

    let backend = RedisBackend::connect(&config.session_store.connection_url()).await?;
    let store = SessionStore::new(
        Arc::new(backend),
        registry.breaker("redis"),
        config.session_store.read_timeout(),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let server = GatewayServer::new(&config, &registry, store);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
