// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat App: account, profile and contact backend for the chat UI.
//!
//! This crate provides the API the chat frontend talks to for signup/login,
//! session bootstrapping, profile editing and username search. Identity,
//! documents and avatar blobs live in Firebase.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{
    AuthService, ContactService, IdentityService, ProfileService, SessionManager, StorageService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth_service: AuthService,
    pub sessions: SessionManager,
    pub profile_service: ProfileService,
    pub contact_service: ContactService,
}

impl AppState {
    /// Wire the services together over the given collaborators.
    pub fn new(
        config: Config,
        db: FirestoreDb,
        identity: IdentityService,
        storage: StorageService,
    ) -> Self {
        let sessions = SessionManager::new(db.clone(), config.heartbeat_interval);
        let profile_service = ProfileService::new(
            db.clone(),
            storage,
            identity.clone(),
            sessions.clone(),
            config.default_avatar_url.clone(),
        );
        let contact_service =
            ContactService::new(db.clone(), config::PLACEHOLDER_AVATAR_URL.to_string());
        let auth_service = AuthService::new(identity, db.clone());

        Self {
            config,
            db,
            auth_service,
            sessions,
            profile_service,
            contact_service,
        }
    }
}
