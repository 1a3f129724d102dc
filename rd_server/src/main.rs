//! Tournament bracket server.
//!
//! Serves the bracket API over PostgreSQL or, with `--memory`, over a
//! process-local store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;
use racket_draw::{
    BracketManager, BracketRepository,
    db::{Database, InMemoryRepository},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rd_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use tracing::info;

const HELP: &str = "\
Run the tournament bracket server

USAGE:
  rd_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/racket_draw]

FLAGS:
  --memory                 Keep brackets in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORAGE_BACKEND          postgres | memory
  METRICS_BIND             Prometheus listener address (metrics disabled when unset)
  RNG_SEED                 Fixed seed for random draws
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let memory = pargs.contains("--memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let db_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, db_url, memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported on {}", addr);
    }

    let (repo, database): (Arc<dyn BracketRepository>, Option<Database>) = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected and migrated");
            (Arc::new(db.repository()), Some(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, brackets are lost on restart");
            (Arc::new(InMemoryRepository::new()), None)
        }
    };

    let manager = match config.rng_seed {
        Some(seed) => {
            info!("Random draws seeded with {}", seed);
            BracketManager::with_rng(repo, StdRng::seed_from_u64(seed))
        }
        None => BracketManager::new(repo),
    };

    let app = api::create_router(api::AppState::new(manager, database.clone()));

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
