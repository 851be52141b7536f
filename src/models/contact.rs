//! Contact sidebar models.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserProfile;

/// Number of placeholder rows in the sidebar roster.
pub const PLACEHOLDER_ROSTER_SIZE: usize = 12;

/// One row of the sidebar roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ContactSummary {
    pub name: String,
    pub last_message: String,
    pub avatar: String,
}

impl ContactSummary {
    pub fn placeholder(avatar: &str) -> Self {
        Self {
            name: "Richard Stranford".to_string(),
            last_message: "Hello How are you".to_string(),
            avatar: avatar.to_string(),
        }
    }
}

/// Public view of a user found by username search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SearchResult {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub last_seen: i64,
}

impl From<UserProfile> for SearchResult {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            name: profile.name,
            avatar: profile.avatar,
            bio: profile.bio,
            last_seen: profile.last_seen,
        }
    }
}
