// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user session context.
//!
//! Each signed-in user owns:
//! - a `watch` channel carrying immutable [`SessionState`] snapshots
//! - a presence flag gating the `lastSeen` heartbeat
//! - the heartbeat task handle, aborted on reload and teardown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Route, SessionEvent, SessionState, UserProfile};
use crate::time_utils::now_millis;

struct UserSession {
    state: watch::Sender<Arc<SessionState>>,
    presence: Arc<AtomicBool>,
    heartbeat: Option<JoinHandle<()>>,
}

impl UserSession {
    fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(SessionState::default()));
        Self {
            state,
            presence: Arc::new(AtomicBool::new(false)),
            heartbeat: None,
        }
    }

    fn apply(&self, event: SessionEvent) {
        self.state.send_modify(|current| {
            *current = Arc::new(current.apply(event));
        });
    }

    fn stop_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}

impl Drop for UserSession {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}

/// Registry of live sessions, shared across requests.
#[derive(Clone)]
pub struct SessionManager {
    db: FirestoreDb,
    heartbeat_interval: Duration,
    sessions: Arc<DashMap<String, UserSession>>,
}

impl SessionManager {
    pub fn new(db: FirestoreDb, heartbeat_interval: Duration) -> Self {
        Self {
            db,
            heartbeat_interval,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Load the user's profile and chat index into their session and decide
    /// where the client goes next.
    ///
    /// Installs (or replaces) the `lastSeen` heartbeat.
    pub async fn load_user_data(&self, uid: &str) -> Result<Route, AppError> {
        let profile = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        let chats = self.db.get_chat_index(uid).await?;

        let route = Route::for_profile(&profile);

        let mut session = self
            .sessions
            .entry(uid.to_string())
            .or_insert_with(UserSession::new);
        session.apply(SessionEvent::ProfileLoaded(profile));
        session.apply(SessionEvent::ChatsLoaded(chats));

        session.stop_heartbeat();
        let presence = session.presence.clone();
        session.heartbeat = Some(self.spawn_heartbeat(uid, presence));

        tracing::info!(uid, route = ?route, "User data loaded");
        Ok(route)
    }

    /// Replace the profile in the user's session (after an edit).
    pub fn publish_profile(&self, uid: &str, profile: UserProfile) {
        self.sessions
            .entry(uid.to_string())
            .or_insert_with(UserSession::new)
            .apply(SessionEvent::ProfilePublished(profile));
    }

    /// Current snapshot; empty when the user has no session.
    pub fn snapshot(&self, uid: &str) -> Arc<SessionState> {
        self.sessions
            .get(uid)
            .map(|s| s.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Receive every future snapshot for a live session.
    pub fn subscribe(&self, uid: &str) -> Option<watch::Receiver<Arc<SessionState>>> {
        self.sessions.get(uid).map(|s| s.state.subscribe())
    }

    /// Mark the user online/offline. Only online users get heartbeat writes.
    ///
    /// Returns `false` when there is no session to mark.
    pub fn set_presence(&self, uid: &str, online: bool) -> bool {
        match self.sessions.get(uid) {
            Some(session) => {
                session.presence.store(online, Ordering::Relaxed);
                tracing::debug!(uid, online, "Presence updated");
                true
            }
            None => false,
        }
    }

    pub fn is_online(&self, uid: &str) -> bool {
        self.sessions
            .get(uid)
            .map(|s| s.presence.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn has_heartbeat(&self, uid: &str) -> bool {
        self.sessions
            .get(uid)
            .and_then(|s| s.heartbeat.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop the heartbeat, clear presence and drop the session.
    pub fn teardown(&self, uid: &str) {
        if let Some((_, mut session)) = self.sessions.remove(uid) {
            session.presence.store(false, Ordering::Relaxed);
            session.stop_heartbeat();
            session.apply(SessionEvent::Cleared);
            tracing::info!(uid, "Session torn down");
        }
    }

    fn spawn_heartbeat(&self, uid: &str, presence: Arc<AtomicBool>) -> JoinHandle<()> {
        let db = self.db.clone();
        let uid = uid.to_string();
        let period = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; the first write is one period out.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !presence.load(Ordering::Relaxed) {
                    continue;
                }
                if let Err(e) = db.touch_last_seen(&uid, now_millis()).await {
                    tracing::warn!(uid = %uid, error = %e, "Heartbeat write failed");
                }
            }
        })
    }
}
