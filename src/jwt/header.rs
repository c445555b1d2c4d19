//! JWT header (first segment) parsing.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The decoded JOSE header of a JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm, e.g. `"RS256"`.
    pub alg: String,
    /// Token type, conventionally `"JWT"`. Not required to be present.
    #[serde(default)]
    pub typ: Option<String>,
    /// Key ID identifying which JWKS entry signed this token.
    #[serde(default)]
    pub kid: Option<String>,
}

impl Header {
    /// Decode the base64url header segment of a compact JWT.
    pub fn decode(segment: &str) -> Result<Self> {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| Error::InvalidJwt(format!("header base64: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::InvalidJwt(format!("header json: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_alg_and_kid() {
        let header = Header {
            alg: "RS256".to_string(),
            typ: Some("JWT".to_string()),
            kid: Some("key-1".to_string()),
        };
        let json = serde_json::to_vec(&header).unwrap();
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let segment = URL_SAFE_NO_PAD.encode(json);

        let decoded = Header::decode(&segment).unwrap();
        assert_eq!(decoded.alg, "RS256");
        assert_eq!(decoded.kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(Header::decode("not!base64!").is_err());
    }
}
