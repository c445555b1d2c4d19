//! Error types for the OIDC relying-party core.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the relying-party core.
///
/// Each variant identifies one failing check; `Display` messages never
/// reveal which secret comparison (nonce, HMAC signature) produced them.
#[derive(Error, Debug)]
pub enum Error {
    /// `jwks_uri` is missing or not a well-formed URL.
    #[error("invalid JWKS URI: {0}")]
    InvalidJwksUri(String),

    /// Network/5xx failure while fetching a JWKS document.
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),

    /// The JWKS response body was not valid JSON.
    #[error("JWKS parse error: {0}")]
    JwksParseError(String),

    /// The JWKS response JSON did not contain a `keys` array.
    #[error("JWKS document missing `keys` array")]
    JwksInvalid,

    /// No key matching the requested `kid` was found, even after a refresh.
    #[error("JWKS key not found: {0}")]
    JwksKeyNotFound(String),

    /// The caller asked for an empty `kid`.
    #[error("invalid kid: empty")]
    InvalidKid,

    /// A JWT failed to decode for a reason other than segment count.
    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    /// A JWT did not have exactly three dot-separated segments.
    #[error("invalid JWT format: expected 3 segments, found {0}")]
    InvalidJwtFormat(usize),

    /// Claim validation (`iss`/`aud`/`azp`/`exp`/`nbf`/`iat`/`nonce`) failed.
    #[error("ID token validation error: {0}")]
    IdTokenValidationError(String),

    /// Signature verification failed (bad signature, key mismatch, etc).
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// The JWT's `alg` is not in the supported algorithm registry.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// `encode` could not build a token (missing PSS salt length, bad key, ...).
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Discovery document fetch or parse failed.
    #[error("discovery error: {0}")]
    DiscoveryError(String),

    /// `addState` was called with a `state` already present in the store.
    #[error("state collision: {0}")]
    StateCollision(String),

    /// The callback's `state` had no matching flow-state entry.
    #[error("state not found: {0}")]
    StateNotFound(String),

    /// The token endpoint rejected a code exchange.
    #[error("token exchange error: {0}")]
    TokenExchangeError(String),

    /// The token endpoint rejected a refresh (400/401); session is cleared.
    #[error("token refresh error: {0}")]
    TokenRefreshError(String),

    /// No valid session/credentials were presented for a protected operation.
    #[error("unauthenticated")]
    Unauthenticated,

    /// A `sid` had no backing session entry.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Configuration is internally inconsistent (e.g. PKCE required but no
    /// verifier supplied, or `private_key_jwt` selected with no key).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level I/O failure, preserved via `#[from]` for `.source()`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// RFC 6749 §4.1.2.1 `error` code for redirecting a failed auth attempt.
    #[must_use]
    pub fn rfc6749_error_code(&self) -> &'static str {
        match self {
            Self::StateCollision(_) | Self::StateNotFound(_) => "invalid_request",
            Self::IdTokenValidationError(_)
            | Self::SignatureInvalid(_)
            | Self::InvalidJwt(_)
            | Self::InvalidJwtFormat(_) => "invalid_token",
            Self::TokenExchangeError(_) => "invalid_grant",
            Self::UnsupportedAlgorithm(_) => "unsupported_response_type",
            Self::Unauthenticated => "access_denied",
            _ => "server_error",
        }
    }
}
