//! Request preparation shared by every backend.
//!
//! Turns the `(url, body, headers)` triple of [`Fetcher::fetch`] into a
//! [`PreparedRequest`]: URL parsed and scheme checked, method chosen from the
//! body, caller headers merged over the defaults.
//!
//! [`Fetcher::fetch`]: crate::net::Fetcher::fetch

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};
use url::Url;

use crate::config::FetcherConfig;
use crate::errors::NativeError;

/// Schemes accepted by backends that can speak TLS.
pub(crate) const HTTP_SCHEMES: &[&str] = &["http", "https"];

/// Schemes accepted by backends without TLS support.
pub(crate) const PLAIN_HTTP_SCHEMES: &[&str] = &["http"];

#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl PreparedRequest {
    pub fn new(
        url: &str,
        body: Option<&[u8]>,
        headers: Option<&HeaderMap>,
        config: &FetcherConfig,
        schemes: &[&str],
    ) -> Result<Self, NativeError> {
        let url = parse_url(url, schemes)?;

        let body = body.filter(|b| !b.is_empty()).map(<[u8]>::to_vec);
        let method = if body.is_some() { Method::POST } else { Method::GET };

        let mut merged = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| NativeError::InvalidHeader(format!("user agent {:?}", config.user_agent)))?;
        merged.insert(USER_AGENT, user_agent);
        if body.is_some() {
            merged.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        }
        if let Some(headers) = headers {
            merge_headers(&mut merged, headers);
        }

        Ok(Self {
            method,
            url,
            headers: merged,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The request to issue after receiving redirect `status` pointing at `target`.
    pub(crate) fn redirected(&self, status: u16, target: Url) -> Self {
        let mut next = self.clone();

        let to_get = match status {
            303 => self.method != Method::HEAD,
            301 | 302 => self.method == Method::POST,
            _ => false,
        };
        if to_get {
            next.method = Method::GET;
            next.body = None;
            next.headers.remove(CONTENT_TYPE);
            next.headers.remove(CONTENT_LENGTH);
        }

        // Credentials stay with the host they were meant for
        if self.url.host_str() != target.host_str() {
            next.headers.remove(AUTHORIZATION);
        }

        next.url = target;
        next
    }
}

/// Parses an absolute URL and checks its scheme against `schemes`.
pub(crate) fn parse_url(raw: &str, schemes: &[&str]) -> Result<Url, NativeError> {
    let url = Url::parse(raw).map_err(|source| NativeError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    check_scheme(&url, schemes)?;
    Ok(url)
}

pub(crate) fn check_scheme(url: &Url, schemes: &[&str]) -> Result<(), NativeError> {
    if schemes.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(NativeError::UnsupportedScheme(url.scheme().to_string()))
    }
}

/// All values the caller gave for a name replace the default ones.
fn merge_headers(base: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
}
