//! In-memory [`SessionStore`] implementation, backed by a [`DashMap`].
//!
//! Suitable for single-process deployments and as the store this crate's
//! own tests exercise the controller (C10) against. Entries carry a
//! server-side `expires_at` (the memory-store shape mirrors [`TtlCache`]'s
//! lazy-eviction model) so an idle session is reclaimed even if no cookie
//! ever comes back to prompt a `destroy`.
//!
//! [`TtlCache`]: crate::cache::TtlCache

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Error, Result};

use super::store::SessionStore;
use super::types::SessionData;

/// Default server-side session TTL, matching
/// [`crate::config::SessionConfig`]'s own default.
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// An in-memory session store. Does not persist across process restarts.
/// Expired entries are evicted lazily, on the next `get`/`touch`/`update`
/// that observes them — there is no background sweep thread.
pub struct InMemorySessionStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl InMemorySessionStore {
    /// Create an empty store using the default session TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an explicit TTL, applied to every entry
    /// on `create` and reset on `touch`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Current number of stored sessions, including any not-yet-evicted
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store currently holds no (unexpired) sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.iter().all(|entry| entry.is_expired(Instant::now()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, sid: &str, data: SessionData) -> Result<()> {
        self.sessions.insert(
            sid.to_string(),
            Entry {
                data,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, sid: &str) -> Result<Option<SessionData>> {
        let now = Instant::now();
        if let Some(entry) = self.sessions.get(sid) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.data.clone()));
            }
        }
        self.sessions.remove(sid);
        Ok(None)
    }

    async fn update(&self, sid: &str, data: SessionData) -> Result<()> {
        let now = Instant::now();
        let Some(mut entry) = self.sessions.get_mut(sid) else {
            return Err(Error::SessionNotFound(sid.to_string()));
        };
        if entry.is_expired(now) {
            drop(entry);
            self.sessions.remove(sid);
            return Err(Error::SessionNotFound(sid.to_string()));
        }
        entry.data = data;
        Ok(())
    }

    async fn touch(&self, sid: &str) -> Result<()> {
        let now = Instant::now();
        let Some(mut entry) = self.sessions.get_mut(sid) else {
            return Err(Error::SessionNotFound(sid.to_string()));
        };
        if entry.is_expired(now) {
            drop(entry);
            self.sessions.remove(sid);
            return Err(Error::SessionNotFound(sid.to_string()));
        }
        entry.expires_at = now + self.ttl;
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        self.sessions.remove(sid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::SessionState;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let data = SessionData::new("csrf-1", 1000);
        store.create("sid-1", data).await.unwrap();

        let fetched = store.get("sid-1").await.unwrap().unwrap();
        assert_eq!(fetched.state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn update_requires_existing_session() {
        let store = InMemorySessionStore::new();
        let data = SessionData::new("csrf-1", 1000);
        let err = store.update("missing", data).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn destroy_removes_the_session() {
        let store = InMemorySessionStore::new();
        store.create("sid-1", SessionData::new("csrf-1", 1000)).await.unwrap();
        store.destroy("sid-1").await.unwrap();
        assert!(store.get("sid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = InMemorySessionStore::new();
        assert!(store.destroy("never-existed").await.is_ok());
    }

    #[tokio::test]
    async fn entries_expire_after_the_configured_ttl() {
        let store = InMemorySessionStore::with_ttl(Duration::from_millis(1));
        store.create("sid-1", SessionData::new("csrf-1", 1000)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.get("sid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_resets_expiry_without_mutating_payload() {
        let store = InMemorySessionStore::with_ttl(Duration::from_millis(50));
        let mut data = SessionData::new("csrf-1", 1000);
        data.state = SessionState::Authenticated;
        store.create("sid-1", data).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.touch("sid-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let fetched = store.get("sid-1").await.unwrap().unwrap();
        assert_eq!(fetched.state, SessionState::Authenticated);
        assert_eq!(fetched.csrf_token, "csrf-1");
    }

    #[tokio::test]
    async fn touch_fails_once_the_session_has_expired() {
        let store = InMemorySessionStore::with_ttl(Duration::from_millis(1));
        store.create("sid-1", SessionData::new("csrf-1", 1000)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let err = store.touch("sid-1").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }
}
