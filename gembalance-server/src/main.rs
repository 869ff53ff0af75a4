//! Gembalance Server - Headless Daemon
//!
//! A pure Rust HTTP server that:
//! - Manages the upstream key pool (rotation, quotas, health) via /api/*
//! - Runs the periodic health sweep scheduler
//! - Exposes public /health and /version probes

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod router;
mod scheduler;
mod state;

use config::ServerConfig;
use gembalance_core::{HttpDispatcher, KeyPool, KeyStore, MemoryStore, SqliteStore};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load().map_err(|e| anyhow::anyhow!("config: {e}"))?;

    let store: Arc<dyn KeyStore> = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "opening sqlite key store");
            Arc::new(SqliteStore::open(path).map_err(|e| anyhow::anyhow!("store: {e}"))?)
        },
        None => {
            info!("no database_path configured, using in-memory key store");
            Arc::new(MemoryStore::new())
        },
    };

    let pool = Arc::new(KeyPool::new(store, config.quota.clone()));
    let keys = pool.store().list_keys().await.map_err(|e| anyhow::anyhow!("store: {e}"))?;
    info!("loaded {} keys into the pool", keys.len());

    let dispatcher =
        Arc::new(HttpDispatcher::new().map_err(|e| anyhow::anyhow!("dispatcher: {e}"))?);

    let scheduler_handle =
        scheduler::new_handle(config.scheduler.enabled, config.scheduler.interval_minutes);
    let state = AppState::new(pool, dispatcher, config.clone(), scheduler_handle);

    scheduler::start(state.clone());

    let app = router::build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("bind address: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
