// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat App API Server
//!
//! Account, profile and contact backend for the chat frontend, built on
//! Firebase Authentication, Firestore and Firebase Storage.

use chat_app::{
    config::Config,
    db::FirestoreDb,
    services::{IdentityService, StorageService},
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
        offline = config.offline_mode,
        "Starting Chat App API"
    );

    let (db, identity, storage) = if config.offline_mode {
        tracing::warn!("Offline mode: using in-memory Firestore, Auth and Storage");
        (
            FirestoreDb::new_mock(),
            IdentityService::new_mock(),
            StorageService::new_mock(&config.storage_bucket),
        )
    } else {
        let db = FirestoreDb::new(&config.gcp_project_id).await?;
        tracing::info!(bucket = %config.storage_bucket, "Firebase services initialized");
        (
            db,
            IdentityService::new(config.firebase_api_key.clone()),
            StorageService::new(&config.storage_bucket),
        )
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, identity, storage));

    // Build router
    let app = chat_app::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
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
                .add_directive("chat_app=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
