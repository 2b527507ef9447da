//! LMS Gateway - HTTP API for the course catalog.
//!
//! Reads its configuration from the environment (see [`GatewayConfig`]),
//! connects to MongoDB once, optionally creates the declared indexes and
//! serves until the process is stopped.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_catalog::CatalogService;
use lms_gateway::{create_router, GatewayConfig, GatewayState};
use lms_store::{MongoStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LMS Gateway");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        database = %config.mongodb_database,
        sync_indexes = config.sync_indexes,
        cors_origins = ?config.cors_origins,
        "Gateway configuration loaded"
    );

    let store = MongoStore::connect(&config.mongodb_uri, &config.mongodb_database)
        .await
        .context("failed to configure the MongoDB client")?;
    let store = Arc::new(store);

    if config.sync_indexes {
        store
            .sync_indexes()
            .await
            .context("failed to create indexes")?;
        tracing::info!("Indexes synchronized");
    }

    let catalog = Arc::new(CatalogService::new(store));
    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(catalog, config);

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
