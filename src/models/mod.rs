// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod contact;
pub mod editor;
pub mod session;
pub mod user;

pub use contact::{ContactSummary, SearchResult};
pub use editor::{EditorEvent, EditorState, ProfileForm};
pub use session::{Route, SessionEvent, SessionState};
pub use user::{ChatIndex, ProfileUpdate, UserProfile};
