//! In-process session store
//!
//! Handlers take a snapshot of their session, change it and write it back.
//! Concurrent requests of one session are last-write-wins.

use chrono::{DateTime, Duration, Utc};
use mlib_common::CallerContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::playback::{AdhocQueue, PlaybackState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "mlib_session";

/// Per-login state
#[derive(Debug, Clone)]
pub struct Session {
    pub caller: CallerContext,
    pub playback: Option<PlaybackState>,
    pub queue: AdhocQueue,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn has_private_access(&self) -> bool {
        self.caller.has_private_access
    }
}

/// Sessions keyed by opaque id, with sliding expiry
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Open a session for a caller and return its id
    pub async fn create(&self, caller: CallerContext) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session {
            caller,
            playback: None,
            queue: AdhocQueue::default(),
            expires_at: Utc::now() + self.ttl,
        };
        debug!(user_id = session.caller.user_id, "Session created");
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    /// Snapshot of a live session; expired sessions are dropped
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(session) if session.expires_at > now => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(id);
        debug!("Expired session removed");
        None
    }

    /// Write a session back and extend its expiry
    pub async fn put(&self, id: &str, mut session: Session) {
        session.expires_at = Utc::now() + self.ttl;
        self.sessions.write().await.insert(id.to_string(), session);
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Drop every expired session; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}
