// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Green Tracker API Server
//!
//! Logs carbon-emitting and carbon-saving activities, keeps per-user
//! running totals and serves a community leaderboard.

use green_tracker::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, Store},
    services::EstimatorClient,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Green Tracker API"
    );

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            let seeded = db.seed_categories().await?;
            tracing::info!(count = seeded, "Category catalog seeded");
            Arc::new(db)
        }
    };

    let estimator = EstimatorClient::new(
        config.estimator_url.clone(),
        config.estimator_api_key.clone(),
    )?;
    if !estimator.is_configured() {
        tracing::info!("Emission estimator not configured; /api/estimate will return 503");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config, store, estimator));

    // Build router
    let app = green_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("green_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
