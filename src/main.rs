// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive Token Broker API Server
//!
//! Brokers Google and Microsoft OAuth tokens for Drive/Graph file access.

use drive_token_broker::{
    config::{Config, StorageBackend},
    db::{CredentialStore, FirestoreDb, MemoryDb},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Drive Token Broker");

    // Initialize credential store
    let db: Arc<dyn CredentialStore> = match &config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory credential store; tokens are lost on restart");
            Arc::new(MemoryDb::new())
        }
        StorageBackend::Firestore { project_id } => Arc::new(FirestoreDb::new(project_id).await?),
    };

    // Build shared state
    let state = Arc::new(AppState::from_config(config.clone(), db));

    // Build router
    let app = drive_token_broker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drive_token_broker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
