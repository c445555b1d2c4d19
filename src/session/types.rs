//! Session data and the state machine a session moves through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A session's position in its lifecycle.
///
/// Transitions: `Anonymous -> Authenticating -> Authenticated`, then
/// `Authenticated <-> Refreshing` on each access-token renewal, and
/// `Authenticated -> Expired` when the refresh token itself is no longer
/// usable, or `-> Terminated` on explicit logout or detected tampering
/// (csrf token mismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No authentication attempt has been made yet.
    Anonymous,
    /// An authorization redirect has been issued; awaiting the callback.
    Authenticating,
    /// Tokens are present and the access token is (or was last known to be)
    /// valid.
    Authenticated,
    /// A refresh is in progress; readers may still use the last known-good
    /// access token until it completes (per the per-session mutex model).
    Refreshing,
    /// The refresh token was rejected by the provider; tokens are cleared.
    Expired,
    /// The session was explicitly logged out or destroyed for tampering.
    Terminated,
}

/// The data bound to one `sid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Opaque or JWT access token, present once authenticated.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token, present if the provider issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// ID token (compact JWT), present for OIDC flows.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Unix seconds after which `access_token` should be treated as expired.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Decoded ID token claims, cached at authentication time for cheap
    /// re-reads (`requireAuth` callers commonly want `sub`/`email`/etc).
    #[serde(default)]
    pub claims: Option<Value>,
    /// Anti-tampering token created alongside the session and checked on
    /// each access; a mismatch signals the session cookie/store entry no
    /// longer agree and the session is treated as compromised.
    pub csrf_token: String,
    /// Unix seconds this session was created.
    pub created_at: i64,
    /// Unix seconds this session was last touched.
    pub last_accessed_at: i64,
}

impl SessionData {
    /// Start a brand-new, unauthenticated session.
    #[must_use]
    pub fn new(csrf_token: impl Into<String>, now: i64) -> Self {
        Self {
            state: SessionState::Anonymous,
            access_token: None,
            refresh_token: None,
            id_token: None,
            expires_at: None,
            claims: None,
            csrf_token: csrf_token.into(),
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// Whether the access token is expired as of `now`, given no buffer.
    /// Callers that want renewal headroom should compare against
    /// `expires_at` minus their own buffer instead.
    #[must_use]
    pub fn is_access_token_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_anonymous() {
        let session = SessionData::new("csrf-1", 1000);
        assert_eq!(session.state, SessionState::Anonymous);
        assert!(session.access_token.is_none());
    }

    #[test]
    fn expiry_check_respects_expires_at() {
        let mut session = SessionData::new("csrf-1", 1000);
        session.expires_at = Some(2000);
        assert!(!session.is_access_token_expired(1500));
        assert!(session.is_access_token_expired(2000));
    }

    #[test]
    fn no_expires_at_never_reports_expired() {
        let session = SessionData::new("csrf-1", 1000);
        assert!(!session.is_access_token_expired(i64::MAX));
    }
}
