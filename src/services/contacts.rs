// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact sidebar: placeholder roster and username search.
//!
//! Searches run per keystroke. A newer search from the same user aborts the
//! one still in flight, and the older caller gets [`AppError::Superseded`]
//! instead of a stale result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::AbortHandle;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::contact::PLACEHOLDER_ROSTER_SIZE;
use crate::models::{ContactSummary, SearchResult};

/// The in-flight query for one user.
struct InFlight {
    ticket: u64,
    handle: AbortHandle,
}

/// Deregisters a search when its caller stops waiting.
///
/// If the request future is dropped mid-query (client went away), the
/// entry is removed and the query aborted; a newer search's entry is left
/// alone.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<String, InFlight>,
    uid: &'a str,
    ticket: u64,
    finished: bool,
}

impl InFlightGuard<'_> {
    /// Deregister after the query completed. Returns `false` when a newer
    /// search replaced this one.
    fn finish(mut self) -> bool {
        self.finished = true;
        self.in_flight
            .remove_if(self.uid, |_, entry| entry.ticket == self.ticket)
            .is_some()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some((_, entry)) = self
            .in_flight
            .remove_if(self.uid, |_, entry| entry.ticket == self.ticket)
        {
            entry.handle.abort();
            tracing::debug!(uid = self.uid, "Abandoned search cancelled");
        }
    }
}

#[derive(Clone)]
pub struct ContactService {
    db: FirestoreDb,
    placeholder_avatar: String,
    in_flight: Arc<DashMap<String, InFlight>>,
    next_ticket: Arc<AtomicU64>,
}

impl ContactService {
    pub fn new(db: FirestoreDb, placeholder_avatar: String) -> Self {
        Self {
            db,
            placeholder_avatar,
            in_flight: Arc::new(DashMap::new()),
            next_ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Static sidebar roster (not backed by stored data).
    pub fn roster(&self) -> Vec<ContactSummary> {
        vec![ContactSummary::placeholder(&self.placeholder_avatar); PLACEHOLDER_ROSTER_SIZE]
    }

    /// Look up another user by exact, lower-cased username.
    ///
    /// Returns the first match that is not the caller, or `None` for blank
    /// input.
    pub async fn search(&self, uid: &str, input: &str) -> Result<Option<SearchResult>, AppError> {
        if input.trim().is_empty() {
            self.cancel(uid);
            return Ok(None);
        }

        let username = input.to_lowercase();
        let db = self.db.clone();
        let query = username.clone();
        let task = tokio::spawn(async move { db.find_users_by_username(&query).await });

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let previous = self.in_flight.insert(
            uid.to_string(),
            InFlight {
                ticket,
                handle: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
            tracing::debug!(uid, "Superseded in-flight search");
        }
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            uid,
            ticket,
            finished: false,
        };

        let result = task.await;

        if !guard.finish() {
            return Err(AppError::Superseded);
        }

        let matches = match result {
            Ok(matches) => matches?,
            Err(e) if e.is_cancelled() => return Err(AppError::Superseded),
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Search task failed: {}",
                    e
                )))
            }
        };

        let found = matches
            .into_iter()
            .find(|profile| profile.id != uid)
            .map(SearchResult::from);

        tracing::debug!(uid, query = %username, found = found.is_some(), "Username search");
        Ok(found)
    }

    /// Abort the user's in-flight search, if any.
    pub fn cancel(&self, uid: &str) {
        if let Some((_, previous)) = self.in_flight.remove(uid) {
            previous.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    async fn service() -> ContactService {
        let db = FirestoreDb::new_mock();
        db.set_user(&UserProfile::new_signup("uid-alice", "alice", "a@x.com", 0))
            .await
            .unwrap();
        db.set_user(&UserProfile::new_signup("uid-bob", "bob", "b@x.com", 0))
            .await
            .unwrap();
        ContactService::new(db, "/assets/profile_img.png".to_string())
    }

    #[tokio::test]
    async fn test_roster_has_twelve_placeholders() {
        let contacts = service().await.roster();
        assert_eq!(contacts.len(), 12);
        assert!(contacts.iter().all(|c| c.name == "Richard Stranford"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let service = service().await;
        let upper = service.search("uid-bob", "Alice").await.unwrap();
        let lower = service.search("uid-bob", "alice").await.unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.unwrap().id, "uid-alice");
    }

    #[tokio::test]
    async fn test_search_skips_self_and_blank_input() {
        let service = service().await;
        assert!(service.search("uid-alice", "alice").await.unwrap().is_none());
        assert!(service.search("uid-alice", "   ").await.unwrap().is_none());
        assert!(service.search("uid-alice", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newer_search_supersedes_older() {
        let service = service().await;
        let (first, second) = tokio::join!(
            service.search("uid-bob", "ali"),
            service.search("uid-bob", "alice"),
        );
        assert!(matches!(first, Err(AppError::Superseded)));
        assert_eq!(second.unwrap().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_abandoned_search_is_deregistered() {
        let service = service().await;

        // Caller gives up while the query is still pending
        tokio::select! {
            biased;
            _ = service.search("uid-bob", "alice") => panic!("query should still be pending"),
            _ = std::future::ready(()) => {}
        }
        assert!(service.in_flight.is_empty());

        // The next search runs normally
        let found = service.search("uid-bob", "alice").await.unwrap();
        assert_eq!(found.unwrap().id, "uid-alice");
    }

    #[tokio::test]
    async fn test_searches_from_different_users_are_independent() {
        let service = service().await;
        let (a, b) = tokio::join!(
            service.search("uid-bob", "alice"),
            service.search("uid-alice", "bob"),
        );
        assert_eq!(a.unwrap().unwrap().id, "uid-alice");
        assert_eq!(b.unwrap().unwrap().id, "uid-bob");
    }
}
