use std::net::SocketAddr;

use metro_server::network::{Reconciler, Timetable};
use metro_server::schedule::ScheduleConfig;
use metro_server::store::{MemoryStore, SnapshotFile};
use metro_server::web::{AppState, create_router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Listen address when `METRO_BIND_ADDR` is not set.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Metro server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = std::env::var("METRO_BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;

    let config = ScheduleConfig::default();
    let store = MemoryStore::new();

    // Seed from the snapshot file, failing fast if it exists but is unreadable
    let snapshot = std::env::var_os("METRO_SNAPSHOT").map(SnapshotFile::new);
    match &snapshot {
        Some(file) if file.path().exists() => {
            file.load()?.restore_into(&store)?;
            info!(path = %file.path().display(), "Loaded snapshot");
        }
        Some(file) => info!(path = %file.path().display(), "No snapshot yet, starting empty"),
        None => info!("METRO_SNAPSHOT not set, changes will not be saved"),
    }

    // Trips are never persisted, and mirrors may be stale after a crash
    Reconciler::new(&store).reconcile_all()?;
    Timetable::new(&store, &config).regenerate_all(config.last_departure)?;

    let state = AppState::new(store, config, snapshot);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Metro server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metro server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
