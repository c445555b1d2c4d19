//! Configuration surface.
//!
//! Loading configuration from files, environment variables, or a CLI is
//! explicitly out of scope: callers construct a [`Config`] directly, or
//! deserialize one themselves with whatever mechanism their host already
//! uses. The `#[serde(default)]` + `Default` convention means a host that
//! wants partial JSON/YAML deserialization gets sensible defaults for
//! anything it omits.

use serde::{Deserialize, Serialize};

use crate::pkce::ChallengeMethod;
use crate::session::{CookieConfig, SameSite};

/// Top-level configuration for a relying-party instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth client ID registered with the provider.
    pub client_id: String,
    /// OAuth client secret, required for `client_secret_basic`/`_post`.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// PEM-encoded PKCS#8 private key, required for `private_key_jwt`.
    #[serde(default)]
    pub private_key_pem: Option<String>,
    /// Signature algorithm used for the `private_key_jwt` client assertion
    /// (RFC 7523 §3), when `private_key_pem` is configured. Ignored for the
    /// other auth methods.
    #[serde(default = "default_private_key_jwt_alg")]
    pub private_key_jwt_alg: String,
    /// The provider's discovery document URL, fetched as-is (no
    /// `/.well-known/openid-configuration` derivation is performed).
    pub discovery_url: String,
    /// This client's registered redirect URI.
    pub redirect_uri: String,
    /// Where to send the user after a successful callback.
    pub post_login_redirect_uri: String,
    /// Where to send the user after logout, if the provider supports it.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    /// Requested scopes.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Whether to use PKCE on the authorization code flow.
    #[serde(default = "default_true")]
    pub pkce: bool,
    /// PKCE challenge method, when `pkce` is enabled.
    #[serde(default)]
    pub pkce_method: PkceMethodConfig,
    /// How this client authenticates at the token endpoint.
    #[serde(default)]
    pub token_endpoint_auth_method: TokenEndpointAuthMethodConfig,
    /// Allowed clock skew, in seconds, for `exp`/`nbf`/`iat` checks.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: i64,
    /// Seconds before expiry at which the token manager transparently
    /// refreshes the access token.
    #[serde(default = "default_refresh_threshold")]
    pub token_refresh_threshold_seconds: i64,
    /// Per-request HTTP timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Session configuration.
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            private_key_pem: None,
            private_key_jwt_alg: default_private_key_jwt_alg(),
            discovery_url: String::new(),
            redirect_uri: String::new(),
            post_login_redirect_uri: String::new(),
            post_logout_redirect_uri: None,
            scopes: default_scopes(),
            pkce: default_true(),
            pkce_method: PkceMethodConfig::default(),
            token_endpoint_auth_method: TokenEndpointAuthMethodConfig::default(),
            clock_skew_seconds: default_clock_skew(),
            token_refresh_threshold_seconds: default_refresh_threshold(),
            timeout_ms: default_timeout_ms(),
            session: SessionConfig::default(),
        }
    }
}

fn default_private_key_jwt_alg() -> String {
    "RS256".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string(), "email".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_clock_skew() -> i64 {
    300
}

fn default_refresh_threshold() -> i64 {
    60
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// PKCE challenge method, configuration-serializable mirror of
/// [`ChallengeMethod`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethodConfig {
    /// `S256`, the default and strongly preferred method.
    #[default]
    S256,
    /// `plain`, accepted only for legacy providers.
    Plain,
}

impl From<PkceMethodConfig> for ChallengeMethod {
    fn from(value: PkceMethodConfig) -> Self {
        match value {
            PkceMethodConfig::S256 => Self::S256,
            PkceMethodConfig::Plain => Self::Plain,
        }
    }
}

/// `token_endpoint_auth_method`, configuration-serializable mirror of
/// [`ClientAuthMethod`] (the key material itself is supplied separately,
/// via `client_secret`/`private_key_pem`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEndpointAuthMethodConfig {
    /// HTTP Basic authentication with the client ID and secret.
    #[default]
    ClientSecretBasic,
    /// Client ID and secret in the request body.
    ClientSecretPost,
    /// A signed JWT client assertion (RFC 7523), using `private_key_pem`.
    PrivateKeyJwt,
}

/// Session storage and cookie configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session idle/absolute TTL, in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: i64,
    /// Whether the controller should transparently renew tokens via a
    /// scheduled timer rather than only on next access.
    #[serde(default)]
    pub use_silent_renew: bool,
    /// Cookie attributes for the session ID cookie.
    pub cookie: CookieSettingsConfig,
}

fn default_session_ttl() -> i64 {
    86_400
}

/// Configuration-serializable mirror of [`CookieConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettingsConfig {
    /// Cookie name.
    pub name: String,
    /// `Path` attribute.
    pub path: String,
    /// `Domain` attribute, if any.
    #[serde(default)]
    pub domain: Option<String>,
    /// `SameSite` attribute.
    pub same_site: SameSiteConfig,
    /// `Secure` attribute.
    pub secure: bool,
    /// `Partitioned` attribute (CHIPS).
    #[serde(default)]
    pub partitioned: bool,
}

impl Default for CookieSettingsConfig {
    fn default() -> Self {
        let defaults = CookieConfig::default();
        Self {
            name: defaults.name,
            path: defaults.path,
            domain: defaults.domain,
            same_site: SameSiteConfig::Lax,
            secure: defaults.secure,
            partitioned: defaults.partitioned,
        }
    }
}

impl CookieSettingsConfig {
    /// Materialize the runtime [`CookieConfig`], folding in the session TTL
    /// as `Max-Age`.
    #[must_use]
    pub fn to_cookie_config(&self, max_age_seconds: i64) -> CookieConfig {
        CookieConfig {
            name: self.name.clone(),
            path: self.path.clone(),
            domain: self.domain.clone(),
            max_age_seconds: Some(max_age_seconds),
            same_site: self.same_site.into(),
            secure: self.secure,
            http_only: true,
            partitioned: self.partitioned,
            priority: None,
        }
    }
}

/// `SameSite`, configuration-serializable mirror of
/// [`crate::session::SameSite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSiteConfig {
    Strict,
    Lax,
    None,
}

impl From<SameSiteConfig> for SameSite {
    fn from(value: SameSiteConfig) -> Self {
        match value {
            SameSiteConfig::Strict => Self::Strict,
            SameSiteConfig::Lax => Self::Lax,
            SameSiteConfig::None => Self::None,
        }
    }
}
