//! JWK / JWKS types and the supported signature algorithm registry.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single JSON Web Key, as found in a `keys` array of a JWKS document.
///
/// Only the members this crate needs to materialize a verification key are
/// modeled explicitly; unknown members are preserved so a caller that wants
/// the raw JSON can still get at it via [`Jwk::extra`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `RSA`, `EC`, or `OKP`.
    pub kty: String,
    /// Key ID, used to select a key for a given JWT's `kid` header.
    #[serde(default)]
    pub kid: Option<String>,
    /// Intended use: `sig` or `enc`. Keys without `sig` are ignored by the
    /// signature verifier.
    #[serde(rename = "use", default)]
    pub use_: Option<String>,
    /// Algorithm this key is restricted to, if the provider set one.
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus, base64url, no padding.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA public exponent, base64url, no padding.
    #[serde(default)]
    pub e: Option<String>,

    /// EC/OKP curve name: `P-256`, `P-384`, `P-521`, `Ed25519`.
    #[serde(default)]
    pub crv: Option<String>,
    /// EC/OKP x coordinate, base64url, no padding.
    #[serde(default)]
    pub x: Option<String>,
    /// EC y coordinate, base64url, no padding.
    #[serde(default)]
    pub y: Option<String>,

    /// Everything else in the key object, kept for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A JWKS document: the `{"keys": [...]}` shape returned by a `jwks_uri`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    /// The keys in this set, in provider-supplied order.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Parse a JWKS document, requiring a `keys` array to be present.
    pub fn parse(body: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| Error::JwksParseError(e.to_string()))?;
        if !value
            .get("keys")
            .is_some_and(serde_json::Value::is_array)
        {
            return Err(Error::JwksInvalid);
        }
        serde_json::from_value(value).map_err(|e| Error::JwksParseError(e.to_string()))
    }

    /// Find a key by `kid`. Providers that publish a single unlabeled key are
    /// matched regardless of the requested `kid`, per common RP behavior.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        if let Some(key) = self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)) {
            return Some(key);
        }
        if self.keys.len() == 1 && self.keys[0].kid.is_none() {
            return self.keys.first();
        }
        None
    }
}

/// The signature algorithms this crate can verify and (for symmetric/HMAC
/// and test-signing purposes) produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    Rs512,
    /// RSASSA-PSS with SHA-256, salt length = hash length.
    Ps256,
    /// RSASSA-PSS with SHA-384, salt length = hash length.
    Ps384,
    /// RSASSA-PSS with SHA-512, salt length = hash length.
    Ps512,
    /// ECDSA on P-256 with SHA-256, raw `r || s` signature.
    Es256,
    /// ECDSA on P-384 with SHA-384, raw `r || s` signature.
    Es384,
    /// ECDSA on P-521 with SHA-512, raw `r || s` signature (132 bytes).
    Es512,
    /// HMAC-SHA256, symmetric.
    Hs256,
    /// HMAC-SHA384, symmetric.
    Hs384,
    /// HMAC-SHA512, symmetric.
    Hs512,
}

impl Algorithm {
    /// Parse the JWT header `alg` value, rejecting `none` and anything not
    /// in the supported registry.
    pub fn parse(alg: &str) -> Result<Self> {
        match alg {
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The `alg` string for this algorithm, as written into a JWT header.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// Whether this algorithm uses a symmetric (shared-secret) key.
    #[must_use]
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }

    /// Fixed-width raw ECDSA signature length in bytes (`r || s`), for the
    /// `ES*` family only.
    #[must_use]
    pub fn ecdsa_signature_len(self) -> Option<usize> {
        match self {
            Self::Es256 => Some(64),
            Self::Es384 => Some(96),
            Self::Es512 => Some(132),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_none_algorithm() {
        assert!(Algorithm::parse("none").is_err());
    }

    #[test]
    fn parse_accepts_every_registered_algorithm() {
        for alg in [
            "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "ES512",
            "HS256", "HS384", "HS512",
        ] {
            assert!(Algorithm::parse(alg).is_ok(), "{alg} should parse");
        }
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        let alg = Algorithm::parse("ES512").unwrap();
        assert_eq!(Algorithm::parse(alg.as_str()).unwrap(), Algorithm::Es512);
    }

    #[test]
    fn es512_signature_length_is_132_bytes() {
        assert_eq!(Algorithm::Es512.ecdsa_signature_len(), Some(132));
    }

    #[test]
    fn jwk_set_parse_rejects_missing_keys_array() {
        let err = JwkSet::parse(r#"{"not_keys": []}"#).unwrap_err();
        assert!(matches!(err, Error::JwksInvalid));
    }

    #[test]
    fn jwk_set_find_matches_by_kid() {
        let set = JwkSet::parse(
            r#"{"keys":[{"kty":"RSA","kid":"a","n":"xx","e":"AQAB"},
                        {"kty":"RSA","kid":"b","n":"yy","e":"AQAB"}]}"#,
        )
        .unwrap();
        assert_eq!(set.find("b").unwrap().kid.as_deref(), Some("b"));
        assert!(set.find("missing").is_none());
    }

    #[test]
    fn jwk_set_find_falls_back_for_single_unlabeled_key() {
        let set = JwkSet::parse(r#"{"keys":[{"kty":"RSA","n":"xx","e":"AQAB"}]}"#).unwrap();
        assert!(set.find("anything").is_some());
    }
}
