// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod contacts;
pub mod identity;
pub mod profile;
pub mod session;
pub mod storage;

pub use auth::AuthService;
pub use contacts::ContactService;
pub use identity::{AuthenticatedUser, IdentityService};
pub use profile::{ProfileService, ProfileSubmission, SaveOutcome};
pub use session::SessionManager;
pub use storage::{AvatarUpload, StorageService};
