// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile editor state machine.
//!
//! ```text
//! Idle ──Load──▶ Loading ──Loaded──▶ Ready ──Submit──▶ Submitting ──Saved──▶ Saved
//!                   │                  ▲                   │
//!                   └─LoadFailed─▶ Error ┴──Load/Submit────┘ (Failed)
//! ```
//!
//! Loads can overlap (two tabs, or a submit that loads implicitly while a
//! GET is in flight). A later `Loaded` replaces the form in `Ready`; load
//! results arriving after the editor moved on to a submit are dropped.

use serde::Serialize;

use crate::error::AppError;
use crate::models::UserProfile;

/// Shown when the name field is blank.
pub const EMPTY_NAME_MESSAGE: &str = "Name cannot be empty!";

/// Editable profile fields plus the currently stored avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileForm {
    pub name: String,
    pub bio: String,
    /// Stored avatar URL (or the default avatar)
    pub previous_avatar: String,
}

impl ProfileForm {
    /// Seed the form from a stored profile.
    pub fn from_profile(profile: Option<&UserProfile>, default_avatar: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            name: profile.map(|p| p.name.clone()).unwrap_or_default(),
            bio: profile.map(|p| p.bio.clone()).unwrap_or_default(),
            previous_avatar: profile
                .and_then(|p| non_empty(&p.avatar))
                .unwrap_or_else(|| default_avatar.to_string()),
        }
    }

    /// The only client-side check: a non-blank name.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation(EMPTY_NAME_MESSAGE.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditorState {
    Idle,
    Loading,
    Ready { form: ProfileForm },
    Submitting { form: ProfileForm },
    Saved { profile: UserProfile },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum EditorEvent {
    Load,
    Loaded(ProfileForm),
    Submit(ProfileForm),
    Saved(UserProfile),
    /// A load could not fetch the profile.
    LoadFailed(String),
    /// A submit could not be saved.
    Failed(String),
}

impl EditorState {
    /// Single transition table for the editor.
    ///
    /// Returns an internal error for transitions the table does not allow.
    pub fn next(self, event: EditorEvent) -> Result<EditorState, AppError> {
        use EditorEvent as E;
        use EditorState as S;

        match (self, event) {
            (
                S::Idle | S::Loading | S::Ready { .. } | S::Saved { .. } | S::Error { .. },
                E::Load,
            ) => Ok(S::Loading),
            // A submit in progress owns the editor until it settles
            (state @ S::Submitting { .. }, E::Load) => Ok(state),
            (S::Loading | S::Ready { .. }, E::Loaded(form)) => Ok(S::Ready { form }),
            (state @ (S::Submitting { .. } | S::Saved { .. } | S::Error { .. }), E::Loaded(_)) => {
                Ok(state)
            }
            (S::Loading, E::LoadFailed(message)) => Ok(S::Error { message }),
            (
                state @ (S::Ready { .. } | S::Submitting { .. } | S::Saved { .. } | S::Error { .. }),
                E::LoadFailed(_),
            ) => Ok(state),
            (S::Ready { .. } | S::Error { .. }, E::Submit(form)) => Ok(S::Submitting { form }),
            (S::Submitting { .. }, E::Saved(profile)) => Ok(S::Saved { profile }),
            (S::Submitting { .. }, E::Failed(message)) => Ok(S::Error { message }),
            (state, event) => Err(AppError::Internal(anyhow::anyhow!(
                "Invalid profile editor transition: {:?} on {:?}",
                state,
                event
            ))),
        }
    }
}
