//! OpenID Provider discovery (C6): fetches and caches a provider's
//! discovery document, coalescing concurrent fetches.
//!
//! The document shape follows RFC 8414 (OAuth Authorization Server
//! Metadata). Per OIDC Discovery 1.0, `discovery_url` is fetched exactly as
//! configured — callers that only know an issuer base pass the full
//! `{issuer}/.well-known/openid-configuration` URL themselves; this client
//! never derives or appends that path on their behalf.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::TtlCache;
use crate::error::{Error, Result};
use crate::single_flight::SingleFlight;

/// Default TTL for a cached discovery document.
pub const DEFAULT_DISCOVERY_TTL: Duration = Duration::from_secs(3600);

/// A provider's discovery document (RFC 8414 members this crate consumes;
/// unrecognized members are preserved in `extra`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier. Trusted as-is from the discovery document; this
    /// crate compares ID token `iss` claims against it, but does not
    /// validate it against the URL the document was fetched from, since
    /// the two are distinct identifiers in OIDC.
    pub issuer: String,
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// JSON Web Key Set URL.
    pub jwks_uri: String,
    /// UserInfo endpoint, if the provider exposes one.
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    /// End-session (logout) endpoint, if the provider exposes one.
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    /// Token revocation endpoint, if the provider exposes one.
    #[serde(default)]
    pub revocation_endpoint: Option<String>,
    /// Token introspection endpoint, if the provider exposes one.
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
    /// Supported `token_endpoint_auth_methods_supported` values.
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Everything else in the document, preserved for callers that need it.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fetches and caches one provider's discovery document.
pub struct DiscoveryClient {
    discovery_url: String,
    http: reqwest::Client,
    cache: TtlCache<(), Arc<ProviderMetadata>>,
    ttl: Duration,
    refresh_guard: SingleFlight<Result<Arc<ProviderMetadata>>>,
}

impl DiscoveryClient {
    /// Create a client that fetches `discovery_url` as-is, with the default
    /// cache TTL.
    #[must_use]
    pub fn new(discovery_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self::with_ttl(discovery_url, http, DEFAULT_DISCOVERY_TTL)
    }

    /// Create a client with an explicit cache TTL.
    #[must_use]
    pub fn with_ttl(discovery_url: impl Into<String>, http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            discovery_url: discovery_url.into(),
            http,
            cache: TtlCache::new(ttl),
            ttl,
            refresh_guard: SingleFlight::new(),
        }
    }

    /// Return the cached discovery document, fetching it on a first call or
    /// after expiry. Pass `force_refresh = true` to bypass a live cache
    /// entry (e.g. after a provider rotation is suspected).
    pub async fn discover(&self, force_refresh: bool) -> Result<Arc<ProviderMetadata>> {
        if !force_refresh {
            if let Some(metadata) = self.cache.get(&()) {
                return Ok(metadata);
            }
        }

        let discovery_url = self.discovery_url.clone();
        let http = self.http.clone();

        let result = self
            .refresh_guard
            .run(move || {
                Box::pin(async move {
                    let url = url::Url::parse(&discovery_url)
                        .map_err(|e| Error::DiscoveryError(e.to_string()))?;
                    let response = http
                        .get(url)
                        .send()
                        .await
                        .map_err(|e| Error::DiscoveryError(e.to_string()))?;
                    if !response.status().is_success() {
                        return Err(Error::DiscoveryError(format!(
                            "unexpected status {}",
                            response.status()
                        )));
                    }
                    let metadata: ProviderMetadata = response
                        .json()
                        .await
                        .map_err(|e| Error::DiscoveryError(e.to_string()))?;
                    Ok(Arc::new(metadata))
                })
            })
            .await;

        if let Ok(metadata) = &result {
            self.cache.set((), metadata.clone());
            debug!(discovery_url = %self.discovery_url, "refreshed discovery cache");
        }
        result
    }

    /// Configured cache TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
