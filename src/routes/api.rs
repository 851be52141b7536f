// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: session, presence and profile.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChatIndex, ProfileForm, Route, UserProfile};
use crate::services::{AvatarUpload, ProfileSubmission, SaveOutcome};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/load", post(load_session))
        .route("/api/presence", put(set_presence))
        .route("/api/profile", get(get_profile).put(update_profile))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionResponse {
    pub profile: Option<UserProfile>,
    pub chats: Option<ChatIndex>,
    pub online: bool,
    /// `lastSeen` as RFC3339, when known
    pub last_seen_at: Option<String>,
}

/// Current session snapshot.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SessionResponse> {
    let snapshot = state.sessions.snapshot(&user.uid);
    let last_seen_at = snapshot
        .profile
        .as_ref()
        .filter(|p| p.last_seen > 0)
        .and_then(|p| chrono::DateTime::from_timestamp_millis(p.last_seen))
        .map(format_utc_rfc3339);

    Json(SessionResponse {
        profile: snapshot.profile.clone(),
        chats: snapshot.chats.clone(),
        online: state.sessions.is_online(&user.uid),
        last_seen_at,
    })
}

#[derive(Serialize)]
pub struct RouteResponse {
    pub route: Route,
}

/// Reload the user's documents into the session.
async fn load_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RouteResponse>> {
    let route = state.sessions.load_user_data(&user.uid).await?;
    Ok(Json(RouteResponse { route }))
}

#[derive(Deserialize)]
pub struct PresenceRequest {
    pub online: bool,
}

#[derive(Serialize)]
pub struct PresenceResponse {
    pub online: bool,
}

/// Mark the user online (heartbeat writes `lastSeen`) or offline.
async fn set_presence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<PresenceRequest>,
) -> Result<Json<PresenceResponse>> {
    if !state.sessions.set_presence(&user.uid, req.online) {
        return Err(AppError::NotFound(
            "No active session; load the session first".to_string(),
        ));
    }
    Ok(Json(PresenceResponse { online: req.online }))
}

// ─── Profile Editor ──────────────────────────────────────────

/// Load the profile editor form.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileForm>> {
    Ok(Json(state.profile_service.load(&user.uid).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AvatarImage {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    pub content_type: String,
    pub data_base64: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub bio: String,
    #[serde(default)]
    #[validate(nested)]
    pub avatar_image: Option<AvatarImage>,
}

/// Save the profile form.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<SaveOutcome>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let image = req
        .avatar_image
        .map(|img| {
            let bytes = BASE64.decode(img.data_base64.as_bytes()).map_err(|_| {
                AppError::BadRequest("Invalid 'data_base64' in avatar_image".to_string())
            })?;
            Ok::<_, AppError>(AvatarUpload {
                filename: img.filename,
                content_type: img.content_type,
                bytes,
            })
        })
        .transpose()?;

    let outcome = state
        .profile_service
        .submit(
            &user.uid,
            ProfileSubmission {
                name: req.name,
                bio: req.bio,
                image,
            },
        )
        .await?;

    Ok(Json(outcome))
}
