//! Claims validation (C3): `iss`/`aud`/`azp`/`exp`/`nbf`/`iat`/`nonce` checks.

use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{Error, Result};

/// Parameters a caller supplies for validating one set of ID token claims.
/// `now` is threaded in explicitly (rather than read from the system clock
/// inside the validator) so tests can exercise `exp`/`nbf` deterministically.
pub struct ValidationOptions<'a> {
    /// Expected issuer (`iss`), compared exactly.
    pub issuer: &'a str,
    /// Expected audience (`aud`); matches if this value appears in a JWT
    /// `aud` that is either a bare string or an array of strings.
    pub audience: &'a str,
    /// Expected nonce, if one was sent in the authorization request.
    pub nonce: Option<&'a str>,
    /// Clock skew tolerance, in seconds, applied to `exp`/`nbf`/`iat`.
    pub leeway_seconds: i64,
    /// Current time as Unix seconds.
    pub now: i64,
    /// Maximum age in seconds since `auth_time`/`iat`, if the caller enforces
    /// a `max_age` on the original authorization request.
    pub max_age_seconds: Option<i64>,
}

/// Validates ID token claims against the options above.
pub struct ClaimsValidator;

impl ClaimsValidator {
    /// Validate `claims` (the decoded JWT payload) against `options`.
    pub fn validate(claims: &Value, options: &ValidationOptions<'_>) -> Result<()> {
        Self::check_issuer(claims, options.issuer)?;
        Self::check_audience(claims, options.audience)?;
        Self::check_azp(claims, options.audience)?;
        Self::check_exp(claims, options.now, options.leeway_seconds)?;
        Self::check_nbf(claims, options.now, options.leeway_seconds)?;
        Self::check_iat(claims, options.now, options.leeway_seconds)?;
        Self::check_nonce(claims, options.nonce)?;
        if let Some(max_age) = options.max_age_seconds {
            Self::check_max_age(claims, options.now, max_age)?;
        }
        Ok(())
    }

    fn check_issuer(claims: &Value, expected: &str) -> Result<()> {
        let iss = claims
            .get("iss")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::IdTokenValidationError("missing `iss`".to_string()))?;
        if iss != expected {
            return Err(Error::IdTokenValidationError(format!(
                "Invalid issuer: expected {expected}, found {iss}"
            )));
        }
        Ok(())
    }

    /// `aud` may be a single string or an array of strings (RFC 7519 §4.1.3).
    fn check_audience(claims: &Value, expected: &str) -> Result<()> {
        let aud = claims
            .get("aud")
            .ok_or_else(|| Error::IdTokenValidationError("missing `aud`".to_string()))?;
        let matches = match aud {
            Value::String(s) => s == expected,
            Value::Array(values) => values
                .iter()
                .any(|v| v.as_str() == Some(expected)),
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(Error::IdTokenValidationError(format!(
                "Audience not found: {expected} not present in {aud}"
            )))
        }
    }

    /// When `aud` contains more than one value and `azp` is present, it
    /// must equal our client ID. A multi-audience token with no `azp` at
    /// all is accepted (there is nothing to disambiguate against), but
    /// logged, since most providers that mint multi-audience tokens do
    /// set `azp`.
    fn check_azp(claims: &Value, expected: &str) -> Result<()> {
        let multi_audience = matches!(claims.get("aud"), Some(Value::Array(v)) if v.len() > 1);
        if !multi_audience {
            return Ok(());
        }
        let Some(azp) = claims.get("azp").and_then(Value::as_str) else {
            warn!("multi-audience ID token has no `azp` to disambiguate");
            return Ok(());
        };
        if azp == expected {
            Ok(())
        } else {
            Err(Error::IdTokenValidationError(
                "Invalid authorized party (azp)".to_string(),
            ))
        }
    }

    fn claim_i64(claims: &Value, name: &str) -> Option<i64> {
        claims.get(name).and_then(Value::as_i64)
    }

    fn check_exp(claims: &Value, now: i64, leeway: i64) -> Result<()> {
        let exp = Self::claim_i64(claims, "exp")
            .ok_or_else(|| Error::IdTokenValidationError("missing `exp`".to_string()))?;
        // Strict: a token is expired the instant `now` reaches `exp` (plus
        // any grace `leeway`), not merely once it passes it.
        if now >= exp + leeway {
            return Err(Error::IdTokenValidationError("token expired".to_string()));
        }
        Ok(())
    }

    fn check_nbf(claims: &Value, now: i64, leeway: i64) -> Result<()> {
        if let Some(nbf) = Self::claim_i64(claims, "nbf") {
            if now < nbf - leeway {
                return Err(Error::IdTokenValidationError(
                    "token not yet valid (`nbf`)".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn check_iat(claims: &Value, now: i64, leeway: i64) -> Result<()> {
        if let Some(iat) = Self::claim_i64(claims, "iat") {
            if iat > now + leeway {
                return Err(Error::IdTokenValidationError(
                    "`iat` is in the future".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Comparison is constant-time to avoid leaking how much of the nonce
    /// matched through response timing.
    fn check_nonce(claims: &Value, expected: Option<&str>) -> Result<()> {
        let Some(expected) = expected else {
            return Ok(());
        };
        let actual = claims
            .get("nonce")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::IdTokenValidationError("Invalid nonce".to_string()))?;
        if actual.as_bytes().ct_eq(expected.as_bytes()).into() {
            Ok(())
        } else {
            Err(Error::IdTokenValidationError("Invalid nonce".to_string()))
        }
    }

    fn check_max_age(claims: &Value, now: i64, max_age: i64) -> Result<()> {
        let auth_time = Self::claim_i64(claims, "auth_time").ok_or_else(|| {
            Error::IdTokenValidationError(
                "`max_age` was requested but token has no `auth_time`".to_string(),
            )
        })?;
        if now - auth_time > max_age {
            return Err(Error::IdTokenValidationError(
                "authentication is older than the requested `max_age`".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_options(now: i64) -> ValidationOptions<'static> {
        ValidationOptions {
            issuer: "https://issuer.example",
            audience: "client-123",
            nonce: None,
            leeway_seconds: 60,
            now,
            max_age_seconds: None,
        }
    }

    #[test]
    fn valid_claims_pass() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": "client-123",
            "exp": 2000,
            "iat": 1000,
        });
        assert!(ClaimsValidator::validate(&claims, &base_options(1500)).is_ok());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let claims = json!({"iss": "https://evil.example", "aud": "client-123", "exp": 2000});
        assert!(ClaimsValidator::validate(&claims, &base_options(1500)).is_err());
    }

    #[test]
    fn audience_array_matches_by_membership() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": ["client-123", "other"],
            "azp": "client-123",
            "exp": 2000,
        });
        assert!(ClaimsValidator::validate(&claims, &base_options(1500)).is_ok());
    }

    #[test]
    fn multi_audience_without_azp_is_accepted() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": ["client-123", "other"],
            "exp": 2000,
        });
        assert!(ClaimsValidator::validate(&claims, &base_options(1500)).is_ok());
    }

    #[test]
    fn multi_audience_with_mismatched_azp_is_rejected() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": ["client-123", "other"],
            "azp": "other",
            "exp": 2000,
        });
        let err = ClaimsValidator::validate(&claims, &base_options(1500)).unwrap_err();
        match err {
            Error::IdTokenValidationError(message) => {
                assert_eq!(message, "Invalid authorized party (azp)");
            }
            other => panic!("expected IdTokenValidationError, got {other:?}"),
        }
    }

    #[test]
    fn expired_token_is_rejected_outside_leeway() {
        let claims = json!({"iss": "https://issuer.example", "aud": "client-123", "exp": 1000});
        assert!(ClaimsValidator::validate(&claims, &base_options(2000)).is_err());
    }

    #[test]
    fn exp_equal_to_now_is_expired_at_zero_skew() {
        let claims = json!({"iss": "https://issuer.example", "aud": "client-123", "exp": 1000});
        let mut options = base_options(1000);
        options.leeway_seconds = 0;
        assert!(ClaimsValidator::validate(&claims, &options).is_err());
    }

    #[test]
    fn exp_one_second_after_now_passes_at_zero_skew() {
        let claims = json!({"iss": "https://issuer.example", "aud": "client-123", "exp": 1001});
        let mut options = base_options(1000);
        options.leeway_seconds = 0;
        assert!(ClaimsValidator::validate(&claims, &options).is_ok());
    }

    #[test]
    fn expired_token_within_leeway_passes() {
        let claims = json!({"iss": "https://issuer.example", "aud": "client-123", "exp": 1000});
        let mut options = base_options(1030);
        options.leeway_seconds = 60;
        assert!(ClaimsValidator::validate(&claims, &options).is_ok());
    }

    #[test]
    fn nonce_mismatch_is_rejected() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": "client-123",
            "exp": 2000,
            "nonce": "abc",
        });
        let mut options = base_options(1500);
        options.nonce = Some("xyz");
        assert!(ClaimsValidator::validate(&claims, &options).is_err());
    }

    #[test]
    fn max_age_exceeded_is_rejected() {
        let claims = json!({
            "iss": "https://issuer.example",
            "aud": "client-123",
            "exp": 2000,
            "auth_time": 500,
        });
        let mut options = base_options(1500);
        options.max_age_seconds = Some(100);
        assert!(ClaimsValidator::validate(&claims, &options).is_err());
    }
}
