// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vaid Dashboard API Server
//!
//! Serves the aggregated admin view (users, client sites, attendance,
//! evidence and inbox) and the admin write operations.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaid_dashboard::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseStorage, FirebaseTokenVerifier, GoogleGeocoder},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Vaid Dashboard API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let geocoder = GoogleGeocoder::new(&config).expect("Failed to initialize geocoder");
    let storage = FirebaseStorage::new(&config);
    tracing::info!(bucket = %config.storage_bucket, "Object storage initialized");

    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new(&config).expect("Failed to initialize token verifier"),
    );

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(db),
        Arc::new(geocoder),
        Arc::new(storage),
        token_verifier,
    ));
    let subscriptions = state.spawn_subscriptions();

    // Build router
    let app = vaid_dashboard::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    subscriptions.abort();
    state.subscriptions.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vaid_dashboard=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
