// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup, login and logout routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::{Route, UserProfile};
use crate::AppState;

/// Public auth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// Auth routes that need a session (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 32, message = "Username must be 1-32 characters"))]
    pub username: String,
    #[validate(length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub uid: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub route: Route,
    pub profile: Option<UserProfile>,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub route: Route,
}

fn validate<T: Validate>(req: &T) -> Result<()> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Session cookie attributes; `Secure` only when the frontend is served over HTTPS.
fn session_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.frontend_url.starts_with("https://"))
        .build()
}

/// Create the account plus its profile and chat index documents.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    validate(&req)?;

    let user = state
        .auth_service
        .signup(&req.username, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(SignupResponse { uid: user.uid })))
}

/// Sign in, load the user's session and tell the client where to go.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    validate(&req)?;

    let user = state.auth_service.login(&req.email, &req.password).await?;

    let token = create_jwt(&user.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let route = match state.sessions.load_user_data(&user.uid).await {
        Ok(route) => {
            state.sessions.set_presence(&user.uid, true);
            route
        }
        // Signup can leave an account without a profile; completing the
        // profile recreates it.
        Err(AppError::NotFound(_)) => {
            tracing::warn!(uid = %user.uid, "Signed in user has no profile document");
            Route::Profile
        }
        Err(e) => return Err(e),
    };

    let profile = state.sessions.snapshot(&user.uid).profile.clone();
    let jar = jar.add(session_cookie(&state, token.clone()));

    Ok((
        jar,
        Json(LoginResponse {
            token,
            route,
            profile,
        }),
    ))
}

/// End the provider session and tear down everything held for the user.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>)> {
    let provider_result = state.auth_service.logout(&user.uid).await;

    state.sessions.teardown(&user.uid);
    state.profile_service.forget(&user.uid);
    state.contact_service.cancel(&user.uid);

    if let Err(e) = provider_result {
        tracing::warn!(uid = %user.uid, error = %e, "Provider sign-out failed");
        return Err(e);
    }

    let jar = jar.remove(session_cookie(&state, String::new()));
    Ok((jar, Json(LogoutResponse { route: Route::Entry })))
}
