use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use wordserweb::session::{
    generators::{Clock, SessionIdGenerator},
    store::{InMemorySessionStore, SessionStore},
};
use wordserweb::SessionError;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Clock that only moves when a test advances it
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl SessionIdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        format!("session-{}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// In-memory session store that records how often it was touched
pub struct CountingSessionStore {
    inner: InMemorySessionStore,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
    gets: AtomicUsize,
}

impl CountingSessionStore {
    pub fn new() -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.inner.has_session(session_id).await
    }

    pub async fn session_count(&self) -> usize {
        self.inner.session_count().await
    }
}

#[async_trait]
impl SessionStore for CountingSessionStore {
    async fn insert(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }
}
