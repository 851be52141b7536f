// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact sidebar routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ContactSummary, SearchResult};
use crate::AppState;

const MAX_QUERY_LEN: usize = 64;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contacts", get(list_contacts))
        .route("/api/contacts/search", get(search_contacts))
}

#[derive(Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<ContactSummary>,
}

async fn list_contacts(State(state): State<Arc<AppState>>) -> Json<ContactsResponse> {
    Json(ContactsResponse {
        contacts: state.contact_service.roster(),
    })
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub user: Option<SearchResult>,
}

/// Username search, issued per keystroke by the sidebar.
async fn search_contacts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    if query.q.chars().count() > MAX_QUERY_LEN {
        return Err(AppError::BadRequest(format!(
            "Search text exceeds {} characters",
            MAX_QUERY_LEN
        )));
    }

    let found = state.contact_service.search(&user.uid, &query.q).await?;
    Ok(Json(SearchResponse { user: found }))
}
