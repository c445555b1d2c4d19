//! Compact JWT decode/encode (C5): ties the header, claims, and signature
//! verifier together into the operations callers actually need.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::jwk::{Algorithm, Jwk};

use super::header::Header;
use super::verify::verify_signature;

/// A JWT split into its parsed parts, returned by [`decode`].
pub struct EncodedJwt {
    /// Parsed JOSE header.
    pub header: Header,
    /// Parsed claims (payload), as raw JSON.
    pub claims: Value,
    /// `header.payload`, the exact bytes the signature covers.
    pub signing_input: Vec<u8>,
    /// Raw signature bytes (decoded from the third segment).
    pub signature: Vec<u8>,
}

/// Split a compact JWT into header/claims/signature without verifying it.
/// Rejects anything that isn't exactly three dot-separated segments.
pub fn decode(token: &str) -> Result<EncodedJwt> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidJwtFormat(parts.len()));
    }
    let [header_b64, claims_b64, signature_b64] = [parts[0], parts[1], parts[2]];

    let header = Header::decode(header_b64)?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|e| Error::InvalidJwt(format!("payload base64: {e}")))?;
    let claims: Value = serde_json::from_slice(&claims_bytes)
        .map_err(|e| Error::InvalidJwt(format!("payload json: {e}")))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| Error::InvalidJwt(format!("signature base64: {e}")))?;

    let signing_input = format!("{header_b64}.{claims_b64}").into_bytes();

    Ok(EncodedJwt {
        header,
        claims,
        signing_input,
        signature,
    })
}

/// Decode `token` and verify its signature against `jwk`. The caller has
/// already resolved which key to use (typically via the JWKS client, C2)
/// and validated the header `alg` is one it expects.
pub fn decode_and_verify(token: &str, jwk: &Jwk) -> Result<EncodedJwt> {
    let encoded = decode(token)?;
    let alg = Algorithm::parse(&encoded.header.alg)?;
    verify_signature(alg, jwk, &encoded.signing_input, &encoded.signature)?;
    Ok(encoded)
}

/// Encode and sign `claims` with a symmetric HMAC key, producing a compact
/// JWT. Used for building `private_key_jwt`-style client assertions is
/// handled separately (those sign with an RSA/EC private key, which
/// `aws-lc-rs`'s signing API takes a PKCS#8 document for, supplied by the
/// caller); this helper covers the HMAC case used in local tests and for
/// providers that accept symmetric client assertions.
pub fn encode_hmac(alg: Algorithm, secret: &[u8], claims: &Value) -> Result<String> {
    if !alg.is_symmetric() {
        return Err(Error::EncodeError(
            "encode_hmac only supports HS256/HS384/HS512".to_string(),
        ));
    }

    let header = Header {
        alg: alg.as_str().to_string(),
        typ: Some("JWT".to_string()),
        kid: None,
    };
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(|e| {
        Error::EncodeError(format!("header serialize: {e}"))
    })?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(|e| {
        Error::EncodeError(format!("claims serialize: {e}"))
    })?);
    let signing_input = format!("{header_b64}.{claims_b64}");

    let key = aws_lc_rs::hmac::Key::new(hmac_algorithm(alg), secret);
    let tag = aws_lc_rs::hmac::sign(&key, signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());

    Ok(format!("{signing_input}.{signature_b64}"))
}

fn hmac_algorithm(alg: Algorithm) -> aws_lc_rs::hmac::Algorithm {
    match alg {
        Algorithm::Hs256 => aws_lc_rs::hmac::HMAC_SHA256,
        Algorithm::Hs384 => aws_lc_rs::hmac::HMAC_SHA384,
        Algorithm::Hs512 => aws_lc_rs::hmac::HMAC_SHA512,
        _ => unreachable!("only called for HMAC algorithms"),
    }
}

/// Top-level `encode`: currently dispatches to the HMAC signer. Kept as the
/// crate's public encode entry point so callers have one name to reach for;
/// asymmetric signing is exposed directly via `crate::jwt::verify` helpers
/// for hosts that hold a private key, since `aws-lc-rs` key construction
/// differs materially between RSA/EC and is usually driven by a PEM the
/// host already manages.
pub fn encode(alg: Algorithm, secret: &[u8], claims: &Value) -> Result<String> {
    encode_hmac(alg, secret, claims)
}
