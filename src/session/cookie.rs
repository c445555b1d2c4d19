//! `Set-Cookie` attribute construction for cookie-carried session IDs.

use serde::{Deserialize, Serialize};

/// `SameSite` cookie attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Never sent cross-site; safest, breaks top-level cross-site redirects
    /// (including, notably, the OIDC authorization redirect itself).
    Strict,
    /// Sent on top-level cross-site navigations (the common choice for an
    /// OIDC session cookie, since the callback redirect is cross-site).
    Lax,
    /// Sent on all requests, cross-site included. Requires `Secure`.
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// `Priority` cookie attribute values (draft CHIPS companion spec; supported
/// by Chromium-family browsers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookiePriority {
    /// Evicted first under the browser's per-domain cookie jar limit.
    Low,
    /// Default priority.
    Medium,
    /// Evicted last.
    High,
}

impl CookiePriority {
    fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Attributes used when writing the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name. Defaults to `sid`.
    pub name: String,
    /// `Path` attribute.
    pub path: String,
    /// `Domain` attribute, if scoping beyond the issuing host is needed.
    #[serde(default)]
    pub domain: Option<String>,
    /// `Max-Age` in seconds; omitted from the cookie if `None` (session
    /// cookie, cleared when the browser closes).
    #[serde(default)]
    pub max_age_seconds: Option<i64>,
    /// `SameSite` attribute.
    pub same_site: SameSite,
    /// `Secure` attribute; should be `true` outside local development.
    pub secure: bool,
    /// `HttpOnly` attribute; should always be `true` for a session cookie.
    pub http_only: bool,
    /// `Partitioned` attribute (CHIPS), for embedded/cross-site contexts.
    #[serde(default)]
    pub partitioned: bool,
    /// `Priority` attribute, if the host wants to opt out of the browser
    /// default eviction order.
    #[serde(default)]
    pub priority: Option<CookiePriority>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "sid".to_string(),
            path: "/".to_string(),
            domain: None,
            max_age_seconds: None,
            same_site: SameSite::Lax,
            secure: true,
            http_only: true,
            partitioned: false,
            priority: None,
        }
    }
}

impl CookieConfig {
    /// Build the full `Set-Cookie` header value for `sid`.
    #[must_use]
    pub fn set_cookie_header(&self, sid: &str) -> String {
        let mut value = format!("{}={sid}", self.name);
        value.push_str(&format!("; Path={}", self.path));
        if let Some(domain) = &self.domain {
            value.push_str(&format!("; Domain={domain}"));
        }
        if let Some(max_age) = self.max_age_seconds {
            value.push_str(&format!("; Max-Age={max_age}"));
        }
        value.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.secure {
            value.push_str("; Secure");
        }
        if self.http_only {
            value.push_str("; HttpOnly");
        }
        if self.partitioned {
            value.push_str("; Partitioned");
        }
        if let Some(priority) = self.priority {
            value.push_str(&format!("; Priority={}", priority.as_str()));
        }
        value
    }

    /// Build the `Set-Cookie` header that immediately expires the cookie,
    /// used on logout.
    #[must_use]
    pub fn clear_cookie_header(&self) -> String {
        let mut value = format!("{}=", self.name);
        value.push_str(&format!("; Path={}", self.path));
        if let Some(domain) = &self.domain {
            value.push_str(&format!("; Domain={domain}"));
        }
        value.push_str("; Max-Age=0");
        value.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.secure {
            value.push_str("; Secure");
        }
        if self.http_only {
            value.push_str("; HttpOnly");
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_header_includes_core_attributes() {
        let config = CookieConfig::default();
        let header = config.set_cookie_header("abc123");
        assert!(header.starts_with("sid=abc123"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Secure"));
        assert!(header.contains("HttpOnly"));
    }

    #[test]
    fn clear_cookie_header_sets_max_age_zero() {
        let config = CookieConfig::default();
        let header = config.clear_cookie_header();
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn partitioned_attribute_is_opt_in() {
        let mut config = CookieConfig::default();
        assert!(!config.set_cookie_header("x").contains("Partitioned"));
        config.partitioned = true;
        assert!(config.set_cookie_header("x").contains("Partitioned"));
    }
}
