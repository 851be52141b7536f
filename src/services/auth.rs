// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account signup, login and logout.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{ChatIndex, UserProfile};
use crate::services::identity::{AuthenticatedUser, IdentityService};
use crate::time_utils::now_millis;

/// Auth gateway over the identity provider and the user documents.
#[derive(Clone)]
pub struct AuthService {
    identity: IdentityService,
    db: FirestoreDb,
}

impl AuthService {
    pub fn new(identity: IdentityService, db: FirestoreDb) -> Self {
        Self { identity, db }
    }

    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    /// Create the account, then its `users/{uid}` and `chats/{uid}` documents.
    ///
    /// The two document writes are independent: if the chat index write
    /// fails the profile stays behind without one.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        let user = self.identity.create_account(email, password).await?;

        let profile = UserProfile::new_signup(&user.uid, username, email, now_millis());
        self.db.set_user(&profile).await?;

        if let Err(e) = self.db.set_chat_index(&user.uid, &ChatIndex::default()).await {
            tracing::error!(
                uid = %user.uid,
                error = %e,
                "Profile created but chat index write failed"
            );
            return Err(e);
        }

        tracing::info!(uid = %user.uid, username = %profile.username, "Signup complete");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AppError> {
        self.identity.sign_in(email, password).await
    }

    pub async fn logout(&self, uid: &str) -> Result<(), AppError> {
        self.identity.sign_out(uid).await
    }
}
