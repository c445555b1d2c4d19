//! Abstract session storage interface.
//!
//! Kept narrow on purpose (per the design notes' "narrow interface" stance):
//! a host can back this with Redis, a database, or an encrypted cookie
//! without the controller (C10) knowing which. [`InMemorySessionStore`] is
//! the reference implementation used by this crate's own tests.

use async_trait::async_trait;

use crate::error::Result;

use super::types::SessionData;

/// Storage for session state, keyed by an opaque session ID (`sid`).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session entry under `sid`, replacing nothing.
    async fn create(&self, sid: &str, data: SessionData) -> Result<()>;

    /// Fetch the current data for `sid`, if it exists.
    async fn get(&self, sid: &str) -> Result<Option<SessionData>>;

    /// Replace the stored data for `sid` wholesale. `Error::SessionNotFound`
    /// if `sid` has no existing entry, so callers never silently create a
    /// session via update.
    async fn update(&self, sid: &str, data: SessionData) -> Result<()>;

    /// Reset `sid`'s server-side TTL without touching its payload.
    /// `Error::SessionNotFound` if `sid` has no existing (unexpired) entry.
    async fn touch(&self, sid: &str) -> Result<()>;

    /// Remove `sid`'s entry, if present. Idempotent.
    async fn destroy(&self, sid: &str) -> Result<()>;
}
