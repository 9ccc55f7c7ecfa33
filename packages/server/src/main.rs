use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use depot::config::AppConfig;
use depot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    // Created first: it also creates the data directory a default SQLite URL points into.
    let blob_store = FilesystemBlobStore::new(
        PathBuf::from(&config.storage.uploads_dir),
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to initialize blob storage")?;

    let registry = registry::open(&config.database.url)
        .await
        .context("Failed to open registry")?;

    if config.identity.admin_secret.is_empty() {
        warn!("No admin secret configured; admin escalation is disabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, registry, Arc::new(blob_store));
    let app = depot::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
