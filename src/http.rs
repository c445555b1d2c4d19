//! Narrow HTTP request/response interfaces the session controller (C10)
//! depends on.
//!
//! The core never binds to a specific web framework; a host adapts its own
//! request/response types to these traits.

use std::collections::HashMap;

/// Read-only view of an incoming HTTP request.
pub trait HttpRequest {
    /// HTTP method, e.g. `"GET"`.
    fn method(&self) -> &str;
    /// Full request URL, including query string.
    fn url(&self) -> &str;
    /// Request headers, by lowercase name.
    fn headers(&self) -> &HashMap<String, String>;
    /// Cookies parsed from the `Cookie` header, by name.
    fn cookies(&self) -> &HashMap<String, String>;
    /// Request body, if any (used for callback POSTs in some flows).
    fn body(&self) -> Option<&[u8]>;

    /// Convenience accessor for a single query-string parameter.
    fn query_param(&self, name: &str) -> Option<String> {
        let query = self.url().split('?').nth(1)?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Write-only view of an outgoing HTTP response, built up by the controller
/// and flushed by the host's adapter.
pub trait HttpResponse {
    /// Set the response status code.
    fn set_status(&mut self, status: u16);
    /// Set a header, replacing any existing value.
    fn set_header(&mut self, name: &str, value: &str);
    /// Append a header, preserving any existing value(s) — used for
    /// multiple `Set-Cookie` headers on one response.
    fn append_header(&mut self, name: &str, value: &str);
    /// Convenience wrapper that appends a `Set-Cookie` header.
    fn set_cookie(&mut self, set_cookie_value: &str) {
        self.append_header("Set-Cookie", set_cookie_value);
    }
    /// Write the response body and consider the response complete.
    fn send(&mut self, body: &[u8]);
}

/// A minimal in-memory `HttpResponse` implementation, useful for tests and
/// for hosts that want to inspect the controller's output before copying it
/// onto their own framework's response type.
#[derive(Debug, Default, Clone)]
pub struct RecordedResponse {
    /// Status code set via `set_status`, defaulting to 200 if never set.
    pub status: u16,
    /// Headers in insertion order, including repeated names (e.g. multiple
    /// `Set-Cookie` values).
    pub headers: Vec<(String, String)>,
    /// Body bytes passed to `send`.
    pub body: Vec<u8>,
}

impl HttpResponse for RecordedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(key, _)| key != name);
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: &[u8]) {
        self.body = body.to_vec();
    }
}
