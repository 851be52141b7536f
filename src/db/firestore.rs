// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile documents, merge writes, `lastSeen` heartbeat)
//! - Chats (per-user chat index)
//! - Username lookup (equality query)
//!
//! An in-memory backend stands in for Firestore in offline mode so the
//! whole flow can run without GCP credentials.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ChatIndex, ProfileUpdate, UserProfile};

/// Field-masked write of the heartbeat timestamp.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastSeenUpdate {
    last_seen: i64,
}

impl LastSeenUpdate {
    const FIELDS: [&'static str; 1] = ["lastSeen"];
}

/// Offline document store.
#[derive(Default)]
struct MemoryStore {
    users: DashMap<String, UserProfile>,
    chats: DashMap<String, ChatIndex>,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not check credentials; skip the ADC lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database for tests and offline mode.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(uid)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.users.get(uid).map(|p| p.value().clone())),
        }
    }

    /// Create or fully replace a user profile.
    pub async fn set_user(&self, profile: &UserProfile) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&profile.id)
                    .object(profile)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store.users.insert(profile.id.clone(), profile.clone());
            }
        }
        Ok(())
    }

    /// Merge-write the editable profile fields, leaving the rest untouched.
    pub async fn merge_user_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .fields(ProfileUpdate::FIELDS)
                    .in_col(collections::USERS)
                    .document_id(uid)
                    .object(update)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store
                    .users
                    .entry(uid.to_string())
                    .or_default()
                    .merge(update);
            }
        }
        Ok(())
    }

    /// Update only the `lastSeen` field of a profile.
    pub async fn touch_last_seen(&self, uid: &str, now_millis: i64) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .fields(LastSeenUpdate::FIELDS)
                    .in_col(collections::USERS)
                    .document_id(uid)
                    .object(&LastSeenUpdate {
                        last_seen: now_millis,
                    })
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => match store.users.get_mut(uid) {
                Some(mut profile) => profile.last_seen = now_millis,
                None => return Err(AppError::NotFound(format!("User {} not found", uid))),
            },
        }
        Ok(())
    }

    /// Find profiles whose username equals `username` exactly.
    pub async fn find_users_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<UserProfile>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let username = username.to_string();
                client
                    .fluent()
                    .select()
                    .from(collections::USERS)
                    .filter(move |q| q.field("username").eq(username.clone()))
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            Backend::Memory(store) => {
                let mut matches: Vec<UserProfile> = store
                    .users
                    .iter()
                    .filter(|entry| entry.value().username == username)
                    .map(|entry| entry.value().clone())
                    .collect();
                // Firestore returns query results ordered by document id
                matches.sort_by(|a, b| a.id.cmp(&b.id));
                Ok(matches)
            }
        }
    }

    // ─── Chat Index Operations ───────────────────────────────────

    /// Get the chat index for a user.
    pub async fn get_chat_index(&self, uid: &str) -> Result<Option<ChatIndex>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::CHATS)
                .obj()
                .one(uid)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.chats.get(uid).map(|c| c.value().clone())),
        }
    }

    /// Create or replace the chat index for a user.
    pub async fn set_chat_index(&self, uid: &str, index: &ChatIndex) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::CHATS)
                    .document_id(uid)
                    .object(index)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store.chats.insert(uid.to_string(), index.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_seen_update_matches_field_mask() {
        let value = serde_json::to_value(LastSeenUpdate { last_seen: 5 }).unwrap();
        assert_eq!(value, serde_json::json!({ "lastSeen": 5 }));
        assert_eq!(LastSeenUpdate::FIELDS, ["lastSeen"]);

        let back: LastSeenUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(back.last_seen, 5);
    }

    #[tokio::test]
    async fn test_memory_merge_leaves_other_fields() {
        let db = FirestoreDb::new_mock();
        let profile = UserProfile::new_signup("uid-1", "alice", "a@x.com", 10);
        db.set_user(&profile).await.unwrap();

        let update = ProfileUpdate {
            avatar: "https://cdn/a.png".to_string(),
            bio: "new bio".to_string(),
            name: "Alice".to_string(),
        };
        db.merge_user_profile("uid-1", &update).await.unwrap();

        let stored = db.get_user("uid-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Alice");
        assert_eq!(stored.username, "alice");
        assert_eq!(stored.email, "a@x.com");
        assert_eq!(stored.last_seen, 10);
    }

    #[tokio::test]
    async fn test_memory_touch_last_seen_requires_document() {
        let db = FirestoreDb::new_mock();
        let err = db.touch_last_seen("missing", 5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_memory_username_query_is_exact() {
        let db = FirestoreDb::new_mock();
        db.set_user(&UserProfile::new_signup("u1", "alice", "a@x.com", 0))
            .await
            .unwrap();
        db.set_user(&UserProfile::new_signup("u2", "alicia", "b@x.com", 0))
            .await
            .unwrap();

        let found = db.find_users_by_username("alice").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
        assert!(db.find_users_by_username("Alice").await.unwrap().is_empty());
    }
}
