//! User profile and chat index documents as stored in Firestore.

use serde::{Deserialize, Serialize};

/// Bio written into every new profile.
pub const DEFAULT_BIO: &str = "Hey , there I am using chat app";

/// User profile stored in Firestore at `users/{uid}`.
///
/// Every field defaults so that partially written documents still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity provider user id (also used as document ID)
    #[serde(default)]
    pub id: String,
    /// Lower-cased username
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Display name (empty until the profile is completed)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    /// Avatar URL, or empty
    #[serde(default)]
    pub avatar: String,
    /// Last heartbeat (epoch milliseconds)
    #[serde(default)]
    pub last_seen: i64,
}

impl UserProfile {
    /// Profile written at signup: blank name and avatar, default bio.
    pub fn new_signup(id: &str, username: &str, email: &str, now_millis: i64) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_lowercase(),
            email: email.to_string(),
            name: String::new(),
            bio: DEFAULT_BIO.to_string(),
            avatar: String::new(),
            last_seen: now_millis,
        }
    }

    /// A profile is complete once both a name and an avatar are set.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.avatar.is_empty()
    }

    /// Apply a merge write locally.
    pub fn merge(&mut self, update: &ProfileUpdate) {
        self.avatar = update.avatar.clone();
        self.bio = update.bio.clone();
        self.name = update.name.clone();
    }
}

/// Fields written by the profile editor (merge semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub avatar: String,
    pub bio: String,
    pub name: String,
}

impl ProfileUpdate {
    /// Firestore field paths touched by the merge write.
    pub const FIELDS: [&'static str; 3] = ["avatar", "bio", "name"];
}

/// Per-user chat list stored at `chats/{uid}`.
///
/// Conversation summaries are opaque here; the index is provisioned at
/// signup and only read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIndex {
    #[serde(default)]
    pub chats_data: Vec<serde_json::Value>,
}
