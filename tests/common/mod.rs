// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chat_app::config::Config;
use chat_app::db::FirestoreDb;
use chat_app::routes::create_router;
use chat_app::services::{IdentityService, StorageService};
use chat_app::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with in-memory Firestore, Auth and Storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_frontend_url("http://localhost:5173")
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config {
        frontend_url: frontend_url.to_string(),
        ..Config::test_default()
    };
    let storage = StorageService::new_mock(&config.storage_bucket);
    let state = Arc::new(AppState::new(
        config,
        FirestoreDb::new_mock(),
        IdentityService::new_mock(),
        storage,
    ));

    (create_router(state.clone()), state)
}

/// Send a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign up and log in through the API; returns (uid, token, login body).
#[allow(dead_code)]
pub async fn signup_and_login(
    app: &axum::Router,
    username: &str,
    email: &str,
    password: &str,
) -> (String, String, Value) {
    let response = send_json(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        })),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let uid = body_json(response).await["uid"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send_json(
        app,
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();

    (uid, token, body)
}

/// Create a session JWT for a uid.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    chat_app::middleware::auth::create_jwt(uid, signing_key).unwrap()
}

/// Create a provider account (no profile documents) and a session token for it.
#[allow(dead_code)]
pub async fn signed_in_token(state: &AppState, email: &str) -> (String, String) {
    let user = state
        .auth_service
        .identity()
        .create_account(email, "secret1")
        .await
        .unwrap();
    let token = create_test_jwt(&user.uid, &state.config.jwt_signing_key);
    (user.uid, token)
}
