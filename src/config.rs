// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (Firebase API key, JWT signing key) are injected as environment
//! variables by the deployment and read once at startup.

use std::env;
use std::time::Duration;

/// Liveness heartbeat period (matches the web client's 60s timer).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Avatar used when a profile has none stored.
pub const DEFAULT_AVATAR_URL: &str = "/assets/avatar_icon.png";

/// Avatar shown on placeholder roster entries.
pub const PLACEHOLDER_AVATAR_URL: &str = "/assets/profile_img.png";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// GCP / Firebase project ID
    pub gcp_project_id: String,
    /// Firebase Storage bucket for avatar uploads
    pub storage_bucket: String,
    /// Server port
    pub port: u16,
    /// Period of the `lastSeen` heartbeat
    pub heartbeat_interval: Duration,
    /// Avatar URL used when none is stored
    pub default_avatar_url: String,
    /// Use in-memory collaborators instead of Firebase
    pub offline_mode: bool,

    // --- Secrets ---
    /// Firebase Web API key (Identity Toolkit)
    pub firebase_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests: offline collaborators and a fast heartbeat.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.firebasestorage.app".to_string(),
            port: 8080,
            heartbeat_interval: Duration::from_millis(50),
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            offline_mode: true,
            firebase_api_key: "test_api_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.firebasestorage.app", gcp_project_id)),
            gcp_project_id,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            heartbeat_interval: Duration::from_secs(
                env::var("HEARTBEAT_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            ),
            default_avatar_url: env::var("DEFAULT_AVATAR_URL")
                .unwrap_or_else(|_| DEFAULT_AVATAR_URL.to_string()),
            offline_mode: env::var("OFFLINE_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
