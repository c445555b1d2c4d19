//! Flow-state store (C7): tracks in-flight authorization attempts keyed by
//! the OAuth `state` parameter, so a callback can be matched back to the
//! PKCE verifier/nonce/redirect it started with.
//!
//! `removeState` deletes on read (a `state` is single-use), matching the
//! hadrian authenticator's `take_auth_state`. `sweep` purges anything older
//! than the configured max age so a host can run cleanup on its own timer
//! without this crate spawning background tasks.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::pkce::ChallengeMethod;

/// Everything needed to validate and continue an authorization attempt when
/// its callback arrives.
#[derive(Debug, Clone)]
pub struct FlowState {
    /// PKCE code verifier generated when the attempt started.
    pub pkce_verifier: String,
    /// PKCE method used, so the token exchange request matches.
    pub pkce_method: ChallengeMethod,
    /// Nonce sent in the authorization request, checked against the ID
    /// token's `nonce` claim.
    pub nonce: String,
    /// Where to send the user after a successful callback.
    pub redirect_after_login: Option<String>,
    /// When this entry was created, for `sweep` aging and max-age checks.
    created_at: Instant,
}

/// In-memory flow-state store keyed by the opaque `state` value.
pub struct StateStore {
    entries: DashMap<String, FlowState>,
    max_age: Duration,
}

impl StateStore {
    /// Create a store that expires entries older than `max_age`.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
        }
    }

    /// Register a new in-flight attempt under `state`. Returns
    /// `Error::StateCollision` if `state` is already registered (a
    /// practically-impossible UUID/random-string collision, but checked
    /// rather than silently overwritten since overwriting would let one
    /// attempt hijack another's callback).
    pub fn add_state(
        &self,
        state: impl Into<String>,
        pkce_verifier: impl Into<String>,
        pkce_method: ChallengeMethod,
        nonce: impl Into<String>,
        redirect_after_login: Option<String>,
    ) -> Result<()> {
        let state = state.into();
        if self.entries.contains_key(&state) {
            return Err(Error::StateCollision(state));
        }
        self.entries.insert(
            state,
            FlowState {
                pkce_verifier: pkce_verifier.into(),
                pkce_method,
                nonce: nonce.into(),
                redirect_after_login,
                created_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Look up `state` without consuming it.
    #[must_use]
    pub fn get_state_entry(&self, state: &str) -> Option<FlowState> {
        self.entries.get(state).map(|entry| entry.clone())
    }

    /// Remove and return the entry for `state` (single use). Returns
    /// `Error::StateNotFound` if absent, already consumed, or older than
    /// `max_age` — an expired entry is treated the same as one that never
    /// existed.
    pub fn remove_state(&self, state: &str) -> Result<FlowState> {
        let (_, entry) = self
            .entries
            .remove(state)
            .ok_or_else(|| Error::StateNotFound(state.to_string()))?;
        if entry.created_at.elapsed() > self.max_age {
            return Err(Error::StateNotFound(state.to_string()));
        }
        Ok(entry)
    }

    /// Purge entries older than the configured max age. Safe to call on any
    /// schedule; correctness of `remove_state`'s age check does not depend
    /// on this having run recently.
    pub fn sweep(&self) {
        let max_age = self.max_age;
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() <= max_age);
    }

    /// Number of in-flight (including stale, unswept) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
