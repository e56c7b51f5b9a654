use std::sync::Arc;

use http::HeaderMap;

use crate::errors::FetchError;
use crate::net::Response;

/// Core fetch capability. Every backend and the exception wrapper implement it.
///
/// ### Contract
/// - `url` must be absolute. Only `http` and `https` are ever accepted.
/// - A non-empty `body` makes the request a POST, anything else a GET.
/// - Caller `headers` are merged over the backend defaults (`User-Agent`, and
///   `Content-Type: text/plain` when posting); caller values win.
/// - 301, 302, 303 and 307 are followed. `Response::final_url` is the last URL
///   fetched. 303 (and 301/302 after a POST) switches to GET and drops the
///   body; 307 preserves method and body.
/// - Every other status is returned as a normal [`Response`].
/// - Invalid URLs, name resolution failures, refused/reset connections,
///   timeouts and premature closes are returned as errors.
///
/// Implementations must be `Send + Sync`. Whether concurrent calls on one
/// instance run in parallel is up to the backend.
pub trait Fetcher: Send + Sync {
    /// Short name of the backend, used in logs.
    fn name(&self) -> &str;

    fn fetch(
        &self,
        url: &str,
        body: Option<&[u8]>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response, FetchError>;

    /// Whether this fetcher normalizes backend errors.
    fn wraps_errors(&self) -> bool {
        false
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        self.as_ref().fetch(url, body, headers)
    }

    fn wraps_errors(&self) -> bool {
        self.as_ref().wraps_errors()
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        self.as_ref().fetch(url, body, headers)
    }

    fn wraps_errors(&self) -> bool {
        self.as_ref().wraps_errors()
    }
}
