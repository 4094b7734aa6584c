//! Depot HTTP Server
//!
//! Serves the upload API over the storage backend named in the config file.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depot_api::{AppState, create_router};
use depot_core::storage::StorageClient;
use depot_shared::AppConfig;

/// Config file used when `DEPOT_CONFIG_FILE` is unset.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depot=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_file =
        std::env::var("DEPOT_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = AppConfig::load(&config_file)
        .with_context(|| format!("failed to load configuration from {config_file}"))?;

    // Build the storage client once; it is shared by every request
    let client = StorageClient::from_app_config(&config).context("failed to create uploader")?;
    info!(
        backend = client.backend().name(),
        bucket = client.backend().bucket(),
        "Uploader ready"
    );

    let state = AppState {
        uploader: Arc::new(client),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
