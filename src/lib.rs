//! OIDC / OAuth 2.0 relying-party core.
//!
//! A client library for driving the OpenID Connect Authorization Code flow
//! (with PKCE), verifying identity tokens against a provider's published
//! JSON Web Key Set, refreshing access tokens, and binding authenticated
//! identities to server-side sessions.
//!
//! # Components
//!
//! - [`cache`] — generic TTL-keyed cache backing the JWKS and discovery
//!   caches.
//! - [`jwk`] — JWK/JWKS types and the supported signature algorithm
//!   registry.
//! - [`jwks`] — fetches, caches, and single-flights refreshes of a
//!   provider's signing keys.
//! - [`discovery`] — fetches and caches a provider's discovery document at
//!   the configured `discovery_url`, as-is.
//! - [`jwt`] — compact JWT decode/encode, claims validation, and signature
//!   verification.
//! - [`pkce`] — PKCE code verifier/challenge generation (RFC 7636).
//! - [`state_store`] — single-use `(state, nonce, code_verifier)` tuples
//!   for in-flight authorization attempts.
//! - [`token_manager`] — code-for-token exchange, refresh, introspection,
//!   and revocation against a provider's token endpoint.
//! - [`session`] — session data, the session state machine, and pluggable
//!   session storage.
//! - [`controller`] — binds a request/response pair to a session and
//!   orchestrates login/callback/logout.
//! - [`http`] — the narrow request/response interfaces the controller
//!   depends on; adapters for a specific web framework live outside this
//!   crate.
//! - [`config`] — the configuration surface a host constructs or
//!   deserializes to assemble the above.
//!
//! Fetching a discovery/config document from a file, environment, or CLI is
//! out of scope, as is acting as an OIDC provider, dynamic client
//! registration, JWE, and SAML — see the top-level design notes for the
//! complete list.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod http;
pub mod jwk;
pub mod jwks;
pub mod jwt;
pub mod pkce;
pub mod session;
pub mod single_flight;
pub mod state_store;
pub mod token_manager;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a process-wide `tracing` subscriber. A convenience for hosts that
/// have no logging setup of their own; `format` may be `Some("json")` for
/// structured output, otherwise a human-readable format is used. Logging
/// itself is ambient — every component in this crate emits through the
/// `tracing` macros directly and works whether or not a subscriber has been
/// installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
