// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile editor: load, validate, upload avatar, merge-write, republish.
//!
//! Each user's editor moves through [`EditorState`]; the current state is
//! kept per uid between the load and the submit.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{EditorEvent, EditorState, ProfileForm, ProfileUpdate, Route, UserProfile};
use crate::services::identity::IdentityService;
use crate::services::session::SessionManager;
use crate::services::storage::{AvatarUpload, StorageService};

pub const PROFILE_SAVED_MESSAGE: &str = "Profile updated successfully!";

/// Values the user submitted from the form.
#[derive(Debug, Clone)]
pub struct ProfileSubmission {
    pub name: String,
    pub bio: String,
    pub image: Option<AvatarUpload>,
}

/// Result of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub profile: UserProfile,
    pub route: Route,
    pub message: &'static str,
}

#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
    storage: StorageService,
    identity: IdentityService,
    sessions: SessionManager,
    default_avatar: String,
    editors: Arc<DashMap<String, EditorState>>,
}

impl ProfileService {
    pub fn new(
        db: FirestoreDb,
        storage: StorageService,
        identity: IdentityService,
        sessions: SessionManager,
        default_avatar: String,
    ) -> Self {
        Self {
            db,
            storage,
            identity,
            sessions,
            default_avatar,
            editors: Arc::new(DashMap::new()),
        }
    }

    /// Current editor state for a user (`Idle` if never loaded).
    pub fn editor_state(&self, uid: &str) -> EditorState {
        self.editors
            .get(uid)
            .map(|s| s.value().clone())
            .unwrap_or(EditorState::Idle)
    }

    /// Drop the user's editor (on logout).
    pub fn forget(&self, uid: &str) {
        self.editors.remove(uid);
    }

    /// Fetch the stored profile and seed the form.
    pub async fn load(&self, uid: &str) -> Result<ProfileForm, AppError> {
        self.transition(uid, EditorEvent::Load)?;

        match self.db.get_user(uid).await {
            Ok(profile) => {
                let form = ProfileForm::from_profile(profile.as_ref(), &self.default_avatar);
                self.transition(uid, EditorEvent::Loaded(form.clone()))?;
                Ok(form)
            }
            Err(e) => {
                self.transition(uid, EditorEvent::LoadFailed(e.user_message()))?;
                Err(e)
            }
        }
    }

    /// Validate and save the profile, then republish it into the session.
    ///
    /// Loads the form first when the editor has not been loaded yet.
    pub async fn submit(
        &self,
        uid: &str,
        submission: ProfileSubmission,
    ) -> Result<SaveOutcome, AppError> {
        let previous_avatar = match self.editor_state(uid) {
            EditorState::Ready { form } => form.previous_avatar,
            EditorState::Submitting { .. } => {
                return Err(AppError::BadRequest(
                    "A profile update is already in progress".to_string(),
                ));
            }
            EditorState::Error { .. } => {
                ProfileForm::from_profile(self.db.get_user(uid).await?.as_ref(), &self.default_avatar)
                    .previous_avatar
            }
            EditorState::Idle | EditorState::Loading | EditorState::Saved { .. } => {
                self.load(uid).await?.previous_avatar
            }
        };

        let form = ProfileForm {
            name: submission.name,
            bio: submission.bio,
            previous_avatar,
        };
        self.transition(uid, EditorEvent::Submit(form.clone()))?;

        match self.save(uid, &form, submission.image.as_ref()).await {
            Ok(profile) => {
                self.transition(uid, EditorEvent::Saved(profile.clone()))?;
                tracing::info!(uid, "Profile updated");
                Ok(SaveOutcome {
                    profile,
                    route: Route::Chat,
                    message: PROFILE_SAVED_MESSAGE,
                })
            }
            Err(e) => {
                tracing::warn!(uid, error = %e, "Profile update failed");
                self.transition(uid, EditorEvent::Failed(e.user_message()))?;
                Err(e)
            }
        }
    }

    async fn save(
        &self,
        uid: &str,
        form: &ProfileForm,
        image: Option<&AvatarUpload>,
    ) -> Result<UserProfile, AppError> {
        form.validate()?;

        let avatar = match image {
            Some(image) => {
                let token = self.identity.fresh_id_token(uid).await?;
                self.storage
                    .upload_avatar(uid, image, token.as_deref())
                    .await?
            }
            None => form.previous_avatar.clone(),
        };

        let update = ProfileUpdate {
            avatar,
            bio: form.bio.clone(),
            name: form.name.clone(),
        };
        self.db.merge_user_profile(uid, &update).await?;

        let profile = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        self.sessions.publish_profile(uid, profile.clone());
        Ok(profile)
    }

    fn transition(&self, uid: &str, event: EditorEvent) -> Result<EditorState, AppError> {
        let mut state = self
            .editors
            .entry(uid.to_string())
            .or_insert(EditorState::Idle);
        let next = (*state).clone().next(event)?;
        *state = next.clone();
        Ok(next)
    }
}
