//! Vitals Binary Entry Point
//!
//! Runs the metrics store behind its HTTP API. Core functionality is
//! provided by the `vitals` library crate.

use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals::{
    config::AppConfig,
    server::{AppState, create_router},
    storage::{MetricStore, SqlitePool, schema},
};

/// Vitals - Tagged Metrics Store
#[derive(Parser, Debug)]
#[command(name = "vitals", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "VITALS_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "VITALS_SERVER_BIND")]
    bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "VITALS_SERVER_PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(long, env = "VITALS_DB_URL")]
    db_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vitals=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Vitals - Tagged Metrics Store");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, falling back to defaults when no file exists
    let mut config = if std::path::Path::new(&cli.config).exists() {
        tracing::info!("Loading configuration from: {}", cli.config);
        AppConfig::load(&cli.config)?
    } else {
        tracing::warn!("Config file '{}' not found, using defaults", cli.config);
        AppConfig::default()
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.db_url {
        config.database.url = url;
    }
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, Database: {}",
        config.server.bind,
        config.server.port,
        config.database.url,
    );

    // Build storage layer
    let pool = SqlitePool::connect_with_size(&config.database.url, config.database.pool_size).await?;
    schema::provision(&pool).await?;
    let store = MetricStore::new(pool);

    tracing::info!("Storage initialized");

    // Start the server
    let router = create_router(AppState { store });
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
