// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session snapshot and the view the client should show next.

use serde::Serialize;

use crate::models::{ChatIndex, UserProfile};

/// Where the client should navigate after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// Login/signup page
    #[serde(rename = "/")]
    Entry,
    /// Profile completion page
    #[serde(rename = "/profile")]
    Profile,
    /// Chat view
    #[serde(rename = "/chat")]
    Chat,
}

impl Route {
    /// Chat for complete profiles, profile completion otherwise.
    pub fn for_profile(profile: &UserProfile) -> Self {
        if profile.is_complete() {
            Route::Chat
        } else {
            Route::Profile
        }
    }
}

/// Changes applied to a [`SessionState`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ProfileLoaded(UserProfile),
    ChatsLoaded(Option<ChatIndex>),
    /// Profile republished after an edit
    ProfilePublished(UserProfile),
    Cleared,
}

/// Immutable snapshot of one user's session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub profile: Option<UserProfile>,
    pub chats: Option<ChatIndex>,
}

impl SessionState {
    /// Produce the next snapshot; `self` is left untouched.
    pub fn apply(&self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::ProfileLoaded(profile) | SessionEvent::ProfilePublished(profile) => {
                SessionState {
                    profile: Some(profile),
                    chats: self.chats.clone(),
                }
            }
            SessionEvent::ChatsLoaded(chats) => SessionState {
                profile: self.profile.clone(),
                chats,
            },
            SessionEvent::Cleared => SessionState::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.chats.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, avatar: &str) -> UserProfile {
        UserProfile {
            id: "uid".to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_route_requires_name_and_avatar() {
        let cases = [
            ("", "", Route::Profile),
            ("Alice", "", Route::Profile),
            ("", "https://cdn/a.png", Route::Profile),
            ("Alice", "https://cdn/a.png", Route::Chat),
        ];
        for (name, avatar, expected) in cases {
            assert_eq!(Route::for_profile(&profile(name, avatar)), expected);
        }
    }

    #[test]
    fn test_route_serializes_as_path() {
        assert_eq!(serde_json::to_value(Route::Chat).unwrap(), "/chat");
        assert_eq!(serde_json::to_value(Route::Profile).unwrap(), "/profile");
        assert_eq!(serde_json::to_value(Route::Entry).unwrap(), "/");
    }

    #[test]
    fn test_apply_does_not_mutate_previous_snapshot() {
        let empty = SessionState::default();
        let loaded = empty.apply(SessionEvent::ProfileLoaded(profile("A", "")));
        assert!(empty.is_empty());
        assert_eq!(loaded.profile.as_ref().unwrap().name, "A");

        let with_chats = loaded.apply(SessionEvent::ChatsLoaded(Some(ChatIndex::default())));
        assert!(with_chats.profile.is_some());
        assert!(with_chats.chats.is_some());

        let cleared = with_chats.apply(SessionEvent::Cleared);
        assert!(cleared.is_empty());
    }
}
