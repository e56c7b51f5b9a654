//! Redirect driver shared by all backends.
//!
//! Backends switch off their engine's own redirect handling and only perform
//! single hops. [`follow`] re-issues the request until a terminal status is
//! reached, so every engine follows exactly the same rules.

use http::header::LOCATION;
use http::HeaderMap;
use url::Url;

use crate::errors::NativeError;
use crate::net::request::{check_scheme, PreparedRequest};
use crate::net::Response;

/// Result of a single request/response exchange.
#[derive(Debug)]
pub(crate) struct Hop {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Statuses that are followed. Everything else is terminal, 308 included.
pub(crate) fn is_followed_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307)
}

/// Sends `request` through `send`, following redirects until a terminal
/// response or `max_redirects` followed hops.
pub(crate) fn follow<F>(
    request: PreparedRequest,
    max_redirects: usize,
    schemes: &[&str],
    mut send: F,
) -> Result<Response, NativeError>
where
    F: FnMut(&PreparedRequest) -> Result<Hop, NativeError>,
{
    let mut request = request;
    let mut followed = 0;

    loop {
        let hop = send(&request)?;
        log::debug!("{} {} -> {}", request.method(), request.url(), hop.status);

        if !is_followed_redirect(hop.status) {
            return Ok(Response::new(request.url().clone(), hop.status, hop.headers, hop.body));
        }

        if followed >= max_redirects {
            log::warn!("Giving up on {} after {} redirects", request.url(), followed);
            return Err(NativeError::TooManyRedirects(max_redirects));
        }

        let target = location(request.url(), hop.status, &hop.headers)?;
        check_scheme(&target, schemes)?;

        request = request.redirected(hop.status, target);
        followed += 1;
    }
}

/// Resolves the `Location` header against the URL that produced it.
fn location(base: &Url, status: u16, headers: &HeaderMap) -> Result<Url, NativeError> {
    let raw = headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(NativeError::MissingLocation { status })?;

    base.join(raw).map_err(|source| NativeError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
