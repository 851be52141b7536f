// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Form validation failure; the message is shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    /// Identity provider error carrying its structured code
    /// (e.g. `auth/email-already-in-use`).
    #[error("Identity provider error: {code}")]
    Provider { code: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A newer request for the same input replaced this one.
    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build a provider error from its code.
    pub fn provider(code: impl Into<String>) -> Self {
        AppError::Provider { code: code.into() }
    }

    /// Human-readable text for the user.
    ///
    /// Provider codes are turned into words: `auth/email-already-in-use`
    /// becomes `email already in use`.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Provider { code } => readable_provider_code(code),
            AppError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Derive user-facing text from a provider code (`<service>/<words-with-dashes>`).
pub fn readable_provider_code(code: &str) -> String {
    let detail = code.split_once('/').map(|(_, rest)| rest).unwrap_or(code);
    detail.split('-').collect::<Vec<_>>().join(" ")
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(msg.clone()),
            ),
            AppError::Provider { code } => {
                tracing::warn!(code = %code, "Identity provider rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    "auth_error",
                    Some(self.user_message()),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::BAD_GATEWAY, "storage_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Superseded => (StatusCode::CONFLICT, "superseded", None),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
