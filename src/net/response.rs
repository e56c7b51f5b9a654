//! Buffered HTTP response model.
//!
//! A [`Response`] is the result of one fetch: the final URL (after all
//! redirects were followed), status code + reason, response headers, and the
//! raw body bytes. It is built once by a backend and never changed afterwards.
//!
//! ## Notes
//! - The body is stored as raw `Vec<u8>`. For text responses, convert with
//!   `String::from_utf8_lossy(resp.body())`; for JSON, parse with
//!   `serde_json::from_slice::<T>(resp.body())`.
//! - `headers` is an `http::HeaderMap`, which is **case-insensitive** for
//!   header names.
//! - Bodies larger than the configured `max_response_bytes` are truncated.
use http::header::{AsHeaderName, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    final_url: Url,
    status: u16,
    status_text: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(final_url: Url, status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            final_url,
            status,
            status_text,
            headers,
            body,
        }
    }

    /// URL of the terminal response in the redirect chain.
    pub fn final_url(&self) -> &Url {
        &self.final_url
    }

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase, `"Unknown"` for non-standard codes.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the header as text, if present and valid visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
