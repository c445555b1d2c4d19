//! JWKS client (C2): fetches, caches, and refreshes a provider's signing
//! keys, coalescing concurrent refreshes via [`SingleFlight`].
//!
//! A parsed key set is cached behind a TTL; on an unknown `kid` this forces
//! exactly one refresh before giving up, in case the provider rotated keys
//! between the cached fetch and now.
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::error::{Error, Result};
use crate::jwk::{Jwk, JwkSet};
use crate::single_flight::SingleFlight;

/// Default TTL for a cached JWKS document absent explicit cache-control
/// guidance from the HTTP response.
pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);

/// Fetches and caches a single provider's JWKS document.
pub struct JwksClient {
    jwks_uri: String,
    http: reqwest::Client,
    cache: TtlCache<(), Arc<JwkSet>>,
    ttl: Duration,
    refresh_guard: SingleFlight<Result<Arc<JwkSet>>>,
}

impl JwksClient {
    /// Create a client for the given `jwks_uri` with the default TTL.
    pub fn new(jwks_uri: impl Into<String>, http: reqwest::Client) -> Result<Self> {
        Self::with_ttl(jwks_uri, http, DEFAULT_JWKS_TTL)
    }

    /// Create a client with an explicit cache TTL.
    pub fn with_ttl(
        jwks_uri: impl Into<String>,
        http: reqwest::Client,
        ttl: Duration,
    ) -> Result<Self> {
        let jwks_uri = jwks_uri.into();
        url::Url::parse(&jwks_uri).map_err(|e| Error::InvalidJwksUri(e.to_string()))?;
        Ok(Self {
            jwks_uri,
            http,
            cache: TtlCache::new(ttl),
            ttl,
            refresh_guard: SingleFlight::new(),
        })
    }

    /// Return the key for `kid`, refreshing the cache if it's missing,
    /// expired, or the `kid` isn't present yet.
    ///
    /// A cache hit with a matching `kid` returns immediately without a
    /// network call. Otherwise this refreshes once and retries; if the key
    /// is still absent, it refreshes **once more** (the provider may have
    /// rotated keys between the two calls) and retries again before giving
    /// up with `JwksKeyNotFound`. An empty cache after a refresh is reported
    /// as `JwksFetchError` rather than `JwksKeyNotFound`, since it indicates
    /// the upstream document itself was empty rather than merely missing
    /// this one key.
    pub async fn get_key(&self, kid: &str) -> Result<Jwk> {
        if kid.is_empty() {
            return Err(Error::InvalidKid);
        }

        if let Some(set) = self.cache.get(&()) {
            if let Some(key) = set.find(kid) {
                return Ok(key.clone());
            }
            debug!(kid, "kid not found in cached JWKS, forcing refresh");
        }

        for attempt in 0..2 {
            let set = self.refresh_cache().await?;
            if let Some(key) = set.find(kid) {
                return Ok(key.clone());
            }
            if set.keys.is_empty() {
                return Err(Error::JwksFetchError(
                    "JWKS document contains no keys".to_string(),
                ));
            }
            if attempt == 0 {
                debug!(kid, "kid still missing after refresh, retrying once more");
            }
        }
        Err(Error::JwksKeyNotFound(kid.to_string()))
    }

    /// Force a refresh of the cached JWKS document, coalescing concurrent
    /// callers into a single upstream fetch.
    pub async fn refresh_cache(&self) -> Result<Arc<JwkSet>> {
        let jwks_uri = self.jwks_uri.clone();
        let http = self.http.clone();

        let result = self
            .refresh_guard
            .run(move || {
                Box::pin(async move {
                    let response = http
                        .get(&jwks_uri)
                        .send()
                        .await
                        .map_err(|e| Error::JwksFetchError(e.to_string()))?;
                    if !response.status().is_success() {
                        return Err(Error::JwksFetchError(format!(
                            "unexpected status {}",
                            response.status()
                        )));
                    }
                    let body = response
                        .text()
                        .await
                        .map_err(|e| Error::JwksFetchError(e.to_string()))?;
                    JwkSet::parse(&body).map(Arc::new)
                })
            })
            .await;

        match &result {
            Ok(set) => {
                self.cache.set((), set.clone());
                debug!(keys = set.keys.len(), "refreshed JWKS cache");
            }
            Err(e) => warn!(error = %e, "JWKS refresh failed"),
        }
        result
    }

    /// Configured cache TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
