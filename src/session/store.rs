use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::errors::SessionError;

/// Presence set of live session ids.
///
/// A token is only accepted while its session id is present here; deleting
/// the id revokes every token that names it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Registers a new session id. Inserting an id that already exists fails.
    async fn insert(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Removes a session id, returning whether it was present
    async fn delete(&self, key: &str) -> Result<bool, SessionError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
}

/// In-memory implementation of SessionStore
///
/// Sessions live only as long as the process: a restart logs every user out.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, String>>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Drops records whose stored expiry is at or before `now`.
    ///
    /// Values that are not a unix timestamp are kept; presence is what
    /// validation checks and we never guess at a foreign value.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let now_ts = now.timestamp();
        let mut sessions = self.sessions.write().await;
        let initial_count = sessions.len();

        sessions.retain(|_, value| match value.parse::<i64>() {
            Ok(expires_at) => expires_at > now_ts,
            Err(_) => true,
        });

        let removed_count = initial_count - sessions.len();
        debug!(
            expired_sessions_removed = removed_count,
            "Expired sessions purged from memory"
        );
        removed_count
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self, value))]
    async fn insert(&self, key: &str, value: &str) -> Result<(), SessionError> {
        debug!(session_id = %key, "Inserting session in memory");

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(key) {
            warn!(session_id = %key, "Session already exists in memory");
            return Err(SessionError::Store("Session already exists".to_string()));
        }
        sessions.insert(key.to_string(), value.to_string());

        debug!(session_id = %key, "Session inserted in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool, SessionError> {
        debug!(session_id = %key, "Deleting session from memory");

        let removed = self.sessions.write().await.remove(key).is_some();
        if !removed {
            debug!(session_id = %key, "Session not present for deletion");
        }

        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let session = self.sessions.read().await.get(key).cloned();

        match &session {
            Some(_) => debug!(session_id = %key, "Session found in memory"),
            None => debug!(session_id = %key, "Session not found in memory"),
        }

        Ok(session)
    }
}
