//! PKCE (RFC 7636) code verifier/challenge generation.
//!
//! A verifier is 32 random bytes, base64url-no-pad encoded. `S256` is the
//! default challenge method; `plain` is kept for legacy providers that
//! don't support `S256`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// PKCE code challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// `code_challenge = BASE64URL(SHA256(code_verifier))`. Default and
    /// strongly preferred; `plain` exists only for providers that don't
    /// support S256.
    S256,
    /// `code_challenge = code_verifier`, sent unmodified.
    Plain,
}

impl ChallengeMethod {
    /// The `code_challenge_method` query parameter value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

/// A generated PKCE pair: the secret verifier and its public challenge.
pub struct PkcePair {
    /// Kept secret by the client, sent only in the token exchange request.
    pub verifier: String,
    /// Sent in the authorization request.
    pub challenge: String,
    /// Method used to derive `challenge` from `verifier`.
    pub method: ChallengeMethod,
}

/// Generate a new PKCE verifier/challenge pair using `method`.
#[must_use]
pub fn generate(method: ChallengeMethod) -> PkcePair {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let verifier = URL_SAFE_NO_PAD.encode(bytes);

    let challenge = match method {
        ChallengeMethod::S256 => {
            let digest = aws_lc_rs::digest::digest(&aws_lc_rs::digest::SHA256, verifier.as_bytes());
            URL_SAFE_NO_PAD.encode(digest.as_ref())
        }
        ChallengeMethod::Plain => verifier.clone(),
    };

    PkcePair {
        verifier,
        challenge,
        method,
    }
}

/// Verify that `verifier` produces `challenge` under `method`. Used by a
/// token endpoint implementation under test; a real provider does this
/// server-side, but the crate exposes it for self-hosted testing flows.
#[must_use]
pub fn verify(method: ChallengeMethod, verifier: &str, challenge: &str) -> bool {
    match method {
        ChallengeMethod::S256 => {
            let digest = aws_lc_rs::digest::digest(&aws_lc_rs::digest::SHA256, verifier.as_bytes());
            URL_SAFE_NO_PAD.encode(digest.as_ref()) == challenge
        }
        ChallengeMethod::Plain => verifier == challenge,
    }
}
