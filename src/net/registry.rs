use std::sync::{Arc, PoisonError, RwLock};

use http::HeaderMap;

use crate::config::FetcherConfig;
use crate::errors::FetchError;
use crate::net::selection::create_fetcher_with_config;
use crate::net::{ExceptionWrappingFetcher, Fetcher, Response};

/// Holds the process-wide default fetcher.
///
/// The fetcher is built lazily on the first [`get`](Self::get) from the
/// preferred engine and wrapped in an [`ExceptionWrappingFetcher`]. It can be
/// replaced at any time with [`set`](Self::set); fetches already running keep
/// the fetcher they started with.
pub struct FetcherRegistry {
    current: RwLock<Option<Arc<dyn Fetcher>>>,
    config: FetcherConfig,
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::with_config(FetcherConfig::default())
    }

    /// Creates an empty registry. `config` is used for the lazily built fetcher.
    pub fn with_config(config: FetcherConfig) -> Self {
        Self {
            current: RwLock::new(None),
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns the current fetcher, building the preferred one if none is set.
    ///
    /// Idempotent: every call returns the same instance until the registry is
    /// changed with [`set`](Self::set) or [`clear`](Self::clear).
    pub fn get(&self) -> Result<Arc<dyn Fetcher>, FetchError> {
        if let Some(fetcher) = self.current.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(fetcher));
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have built it while we waited for the lock
        if let Some(fetcher) = current.as_ref() {
            return Ok(Arc::clone(fetcher));
        }

        let fetcher: Arc<dyn Fetcher> = Arc::new(ExceptionWrappingFetcher::new(create_fetcher_with_config(&self.config)?));
        log::info!("Default fetcher initialized ({})", fetcher.name());
        *current = Some(Arc::clone(&fetcher));
        Ok(fetcher)
    }

    /// Installs `fetcher` as the default, or resets to the lazily built one
    /// when `None` is given.
    ///
    /// With `wrap_exceptions` the fetcher is decorated with an
    /// [`ExceptionWrappingFetcher`], unless it already normalizes its errors.
    pub fn set(&self, fetcher: Option<Box<dyn Fetcher>>, wrap_exceptions: bool) {
        let fetcher: Option<Arc<dyn Fetcher>> = fetcher.map(|fetcher| {
            if wrap_exceptions && !fetcher.wraps_errors() {
                Arc::new(ExceptionWrappingFetcher::new(fetcher)) as Arc<dyn Fetcher>
            } else {
                Arc::from(fetcher)
            }
        });

        match &fetcher {
            Some(f) => log::info!("Default fetcher set to {} (normalized: {})", f.name(), f.wraps_errors()),
            None => log::info!("Default fetcher cleared"),
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = fetcher;
    }

    pub fn clear(&self) {
        self.set(None, true);
    }

    /// Whether a fetcher is installed or has been built already.
    pub fn is_set(&self) -> bool {
        self.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Fetches through the current fetcher.
    pub fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        self.get()?.fetch(url, body, headers)
    }
}
