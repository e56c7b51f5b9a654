//! Pluggable HTTP fetching for OpenID consumers and servers.
//!
//! Everything that needs to talk HTTP (discovery, association, direct
//! verification) goes through a [`Fetcher`]. A process-wide default is built
//! lazily from the best HTTP engine compiled in, and can be replaced with
//! [`set_default_fetcher`].
//!
//! ```no_run
//! let resp = openid_fetchers::fetch("https://op.example/.well-known/openid", None, None)?;
//! println!("{} {}", resp.status(), resp.final_url());
//! # Ok::<(), openid_fetchers::FetchError>(())
//! ```

pub mod config;
pub mod errors;
pub mod net;

pub use config::{ConfigError, FetcherConfig};
pub use errors::{FailureKind, FetchError, NativeError};
pub use net::{
    create_fetcher, create_fetcher_with_config, fetch, get_default_fetcher, set_default_fetcher, Engine,
    ExceptionWrappingFetcher, Fetcher, FetcherRegistry, Response,
};
