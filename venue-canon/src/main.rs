//! venue-canon - Venue name canonicalization service
//!
//! **Module Identity:**
//! - Name: venue-canon
//! - Port: 5790 (default, configurable)
//!
//! Resolves raw venue names reported by event providers to canonical venue
//! ids and records the assignment per provider event.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use venue_common::config::{resolve_config_path, resolve_root_folder, TomlConfig};
use venue_common::db::init_database;

use venue_canon::db::SqliteVenueStore;
use venue_canon::logging::init_tracing;
use venue_canon::{build_router, AppState};

/// Command-line arguments for venue-canon
#[derive(Parser, Debug)]
#[command(name = "venue-canon")]
#[command(about = "Venue name canonicalization service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and config file
    #[arg(short, long, env = "VENUE_CANON_ROOT")]
    root_folder: Option<PathBuf>,

    /// Config file (default: <root>/venue-canon.toml)
    #[arg(short, long, env = "VENUE_CANON_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "VENUE_CANON_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long, env = "VENUE_CANON_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    let config_path = resolve_config_path(args.config.as_deref(), &root_folder);
    let mut config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    init_tracing(&config.logging.level);

    // Build identification before any database work
    info!(
        "Starting venue-canon v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Root folder: {}", root_folder.display());
    if config_path.exists() {
        info!("Config: {}", config_path.display());
    } else {
        warn!("Config file {} not found, using defaults", config_path.display());
    }
    info!(
        threshold = config.matching.threshold,
        self_match = ?config.matching.self_match,
        learn_fuzzy_aliases = config.matching.learn_fuzzy_aliases,
        "Matching configuration"
    );

    let db_path = config.database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let store = Arc::new(SqliteVenueStore::new(pool));
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.port))?;

    let state = AppState::new(store, config).context("Invalid matching configuration")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("venue-canon listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
