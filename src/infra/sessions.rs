//! Server-side session storage keyed by an opaque cookie value.

use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{application::viewer::SessionState, util::clock::Clock};

#[derive(Debug, Clone)]
struct StoredSession {
    state: SessionState,
    expires_at: OffsetDateTime,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(max_age: StdDuration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: Duration::try_from(max_age).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// Session data for `id`, or `None` when unknown or expired.
    pub async fn load(&self, id: &str) -> Option<SessionState> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(stored) if stored.expires_at > now => return Some(stored.state.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(id);
        None
    }

    /// Store `state` under a fresh id and return the id.
    pub async fn create(&self, state: SessionState) -> String {
        let id = Uuid::new_v4().to_string();
        self.save(&id, state).await;
        id
    }

    /// Replace the data for `id` and push its expiry out by the max age.
    pub async fn save(&self, id: &str, state: SessionState) {
        let expires_at = self.clock.now().saturating_add(self.max_age);
        self.sessions
            .write()
            .await
            .insert(id.to_string(), StoredSession { state, expires_at });
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        before - sessions.len()
    }
}
