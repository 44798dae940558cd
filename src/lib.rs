//! FlowTest -- local-first record store for a UI test recorder.
//!
//! This crate provides the namespaced key-value storage adapter, the test and
//! test-run record service, workspace settings, a simulated recorder, and the
//! JSON API that exposes them.

pub mod api;
pub mod config;
pub mod error;
pub mod recorder;
pub mod records;
pub mod settings;
pub mod storage;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{FlowtestConfig, StorageConfig};
use crate::error::StoreResult;
use crate::records::Latency;
use crate::storage::{LocalStore, MemoryBackend, SqliteBackend};

/// Open the backend described by `cfg` and wrap it in the namespaced adapter.
pub fn open_store(cfg: &StorageConfig) -> StoreResult<LocalStore> {
    if cfg.is_in_memory() {
        let backend = match cfg.quota() {
            Some(quota) => MemoryBackend::with_quota(quota),
            None => MemoryBackend::new(),
        };
        return Ok(LocalStore::new(Arc::new(backend)));
    }

    let backend = SqliteBackend::open(&cfg.db_path, cfg.quota())?;
    Ok(LocalStore::new(Arc::new(backend)))
}

/// Start the FlowTest API server and run until Ctrl-C.
pub async fn serve(config: &FlowtestConfig) -> Result<()> {
    // 1. Initialize Storage
    tracing::info!(db_path = %config.storage.db_path.display(), "Initializing record store");
    let store = open_store(&config.storage)?;

    // 2. Build shared state
    let state = api::state::AppState::new(store, Latency::from(&config.latency));

    // 3. Start API Server
    let addr: std::net::SocketAddr = config.api.bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "FlowTest listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("FlowTest stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
