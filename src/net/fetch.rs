use std::sync::Arc;

use http::HeaderMap;
use lazy_static::lazy_static;

use crate::errors::FetchError;
use crate::net::{Fetcher, FetcherRegistry, Response};

lazy_static! {
    static ref DEFAULT_REGISTRY: FetcherRegistry = FetcherRegistry::default();
}

/// The registry behind the free functions of this module.
pub fn default_registry() -> &'static FetcherRegistry {
    &DEFAULT_REGISTRY
}

/// Returns the default fetcher, creating it on first use.
pub fn get_default_fetcher() -> Result<Arc<dyn Fetcher>, FetchError> {
    DEFAULT_REGISTRY.get()
}

/// Replaces the default fetcher. `None` resets it so that the next
/// [`get_default_fetcher`] builds a fresh one.
pub fn set_default_fetcher(fetcher: Option<Box<dyn Fetcher>>, wrap_exceptions: bool) {
    DEFAULT_REGISTRY.set(fetcher, wrap_exceptions)
}

// Loads an URL through the default fetcher. Passing a body makes it a POST.
pub fn fetch(url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
    DEFAULT_REGISTRY.fetch(url, body, headers)
}
