//! Signature verification (C4): materializes a verification key from a JWK
//! and checks a JWT's signature bytes against its signing input.
//!
//! RSA and EC keys are verified directly through `aws-lc-rs`'s signature
//! API rather than through the higher-level `jsonwebtoken` crate, because
//! that crate's `Algorithm` enum has no `ES512` variant — and ES512 needs a
//! P-521 curve and a 132-byte raw `r || s` signature that this module
//! builds by hand from the JWK's `x`/`y` coordinates.

use aws_lc_rs::hmac as lc_hmac;
use aws_lc_rs::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::jwk::{Algorithm, Jwk};

/// Verify `signature` over `signing_input` (`header.payload`) using `jwk`
/// under the given `alg`. Returns `Ok(())` on a valid signature.
pub fn verify_signature(
    alg: Algorithm,
    jwk: &Jwk,
    signing_input: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    if alg.is_symmetric() {
        return verify_hmac(alg, jwk, signing_input, signature_bytes);
    }

    match alg {
        Algorithm::Rs256 | Algorithm::Rs384 | Algorithm::Rs512 | Algorithm::Ps256
        | Algorithm::Ps384 | Algorithm::Ps512 => verify_rsa(alg, jwk, signing_input, signature_bytes),
        Algorithm::Es256 | Algorithm::Es384 | Algorithm::Es512 => {
            verify_ecdsa(alg, jwk, signing_input, signature_bytes)
        }
        Algorithm::Hs256 | Algorithm::Hs384 | Algorithm::Hs512 => unreachable!("handled above"),
    }
}

fn decode_b64(field: &str, value: &Option<String>) -> Result<Vec<u8>> {
    let raw = value
        .as_ref()
        .ok_or_else(|| Error::SignatureInvalid(format!("JWK missing `{field}`")))?;
    URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|e| Error::SignatureInvalid(format!("JWK `{field}` base64: {e}")))
}

fn rsa_algorithm(alg: Algorithm) -> &'static dyn VerificationAlgorithm {
    match alg {
        Algorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        Algorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        Algorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
        Algorithm::Ps256 => &signature::RSA_PSS_2048_8192_SHA256,
        Algorithm::Ps384 => &signature::RSA_PSS_2048_8192_SHA384,
        Algorithm::Ps512 => &signature::RSA_PSS_2048_8192_SHA512,
        _ => unreachable!("only called for RSA/PSS algorithms"),
    }
}

/// Build a PKCS#1 DER `RSAPublicKey` SEQUENCE from raw JWK `n`/`e` bytes so
/// `aws-lc-rs` can parse it as an RSA public key.
fn rsa_der_from_components(modulus: &[u8], exponent: &[u8]) -> Vec<u8> {
    fn der_integer(bytes: &[u8]) -> Vec<u8> {
        let mut value = bytes.to_vec();
        // Strip leading zero padding but keep a single 0x00 if the high bit
        // is set, so the integer is not misread as negative.
        while value.len() > 1 && value[0] == 0 && value[1] & 0x80 == 0 {
            value.remove(0);
        }
        if value.first().is_some_and(|b| b & 0x80 != 0) {
            value.insert(0, 0);
        }
        let mut out = vec![0x02];
        push_der_len(&mut out, value.len());
        out.extend_from_slice(&value);
        out
    }

    let n = der_integer(modulus);
    let e = der_integer(exponent);
    let mut body = Vec::with_capacity(n.len() + e.len());
    body.extend_from_slice(&n);
    body.extend_from_slice(&e);

    let mut out = vec![0x30];
    push_der_len(&mut out, body.len());
    out.extend_from_slice(&body);
    out
}

fn push_der_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let significant: Vec<u8> = bytes
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect();
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(&significant);
    }
}

fn verify_rsa(
    alg: Algorithm,
    jwk: &Jwk,
    signing_input: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    if jwk.kty != "RSA" {
        return Err(Error::SignatureInvalid(format!(
            "expected RSA key, found kty={}",
            jwk.kty
        )));
    }
    let modulus = decode_b64("n", &jwk.n)?;
    let exponent = decode_b64("e", &jwk.e)?;
    let der = rsa_der_from_components(&modulus, &exponent);

    let verification_alg = rsa_algorithm(alg);
    let key = UnparsedPublicKey::new(verification_alg, der);
    key.verify(signing_input, signature_bytes)
        .map_err(|_| Error::SignatureInvalid("RSA verification failed".to_string()))
}

fn ecdsa_algorithm(alg: Algorithm) -> &'static dyn VerificationAlgorithm {
    match alg {
        Algorithm::Es256 => &signature::ECDSA_P256_SHA256_FIXED,
        Algorithm::Es384 => &signature::ECDSA_P384_SHA384_FIXED,
        Algorithm::Es512 => &signature::ECDSA_P521_SHA512_FIXED,
        _ => unreachable!("only called for ECDSA algorithms"),
    }
}

fn expected_curve(alg: Algorithm) -> &'static str {
    match alg {
        Algorithm::Es256 => "P-256",
        Algorithm::Es384 => "P-384",
        Algorithm::Es512 => "P-521",
        _ => unreachable!("only called for ECDSA algorithms"),
    }
}

fn verify_ecdsa(
    alg: Algorithm,
    jwk: &Jwk,
    signing_input: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    if jwk.kty != "EC" {
        return Err(Error::SignatureInvalid(format!(
            "expected EC key, found kty={}",
            jwk.kty
        )));
    }
    let curve = jwk.crv.as_deref().unwrap_or_default();
    if curve != expected_curve(alg) {
        return Err(Error::SignatureInvalid(format!(
            "curve mismatch: alg {} expects {}, key has {curve}",
            alg.as_str(),
            expected_curve(alg)
        )));
    }

    let expected_len = alg
        .ecdsa_signature_len()
        .expect("ecdsa algorithms always define a raw signature length");
    if signature_bytes.len() != expected_len {
        return Err(Error::SignatureInvalid(format!(
            "expected {expected_len}-byte raw ECDSA signature, found {}",
            signature_bytes.len()
        )));
    }

    let x = decode_b64("x", &jwk.x)?;
    let y = decode_b64("y", &jwk.y)?;
    let mut point = Vec::with_capacity(1 + x.len() + y.len());
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);

    let verification_alg = ecdsa_algorithm(alg);
    let key = UnparsedPublicKey::new(verification_alg, point);
    key.verify(signing_input, signature_bytes)
        .map_err(|_| Error::SignatureInvalid("ECDSA verification failed".to_string()))
}

fn hmac_algorithm(alg: Algorithm) -> lc_hmac::Algorithm {
    match alg {
        Algorithm::Hs256 => lc_hmac::HMAC_SHA256,
        Algorithm::Hs384 => lc_hmac::HMAC_SHA384,
        Algorithm::Hs512 => lc_hmac::HMAC_SHA512,
        _ => unreachable!("only called for HMAC algorithms"),
    }
}

fn verify_hmac(
    alg: Algorithm,
    jwk: &Jwk,
    signing_input: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    // Symmetric keys are carried in the JWK `k` member (OKP/oct shape);
    // represented here via `extra` since `Jwk` doesn't model oct keys
    // explicitly — only JWKS-sourced asymmetric keys are expected in
    // practice, but HMAC is kept for completeness and local testing.
    let k = jwk
        .extra
        .get("k")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::SignatureInvalid("JWK missing `k` for HMAC key".to_string()))?;
    let secret = URL_SAFE_NO_PAD
        .decode(k)
        .map_err(|e| Error::SignatureInvalid(format!("JWK `k` base64: {e}")))?;

    let key = lc_hmac::Key::new(hmac_algorithm(alg), &secret);
    let computed = lc_hmac::sign(&key, signing_input);

    if computed.as_ref().ct_eq(signature_bytes).into() {
        Ok(())
    } else {
        Err(Error::SignatureInvalid("HMAC verification failed".to_string()))
    }
}
