//! Fetching remote resources.
//!
//! [`Fetcher`] is the single capability the rest of the protocol stack uses.
//! Concrete backends live in [`backends`] and are picked by [`selection`];
//! [`ExceptionWrappingFetcher`] normalizes their errors and the
//! [`FetcherRegistry`] holds the default instance behind [`fetch`].

pub mod backends;
mod fetch;
mod fetcher;
mod redirect;
mod registry;
mod request;
mod response;
pub mod selection;
mod wrapping;

#[cfg(test)]
pub(crate) mod test_support;

pub use fetch::{default_registry, fetch, get_default_fetcher, set_default_fetcher};
pub use fetcher::Fetcher;
pub use registry::FetcherRegistry;
pub use request::PreparedRequest;
pub use response::Response;
pub use selection::{
    available_engines, build_fetcher, create_fetcher, create_fetcher_with_config, select_engine,
    Engine,
};
pub use wrapping::{normalize, ExceptionWrappingFetcher};
