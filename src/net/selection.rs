//! Backend selection.
//!
//! Engines are probed once, at first use, by checking which optional engines
//! were compiled in. [`select_engine`] then picks the first available engine
//! in [`Engine::PRIORITY`] order; the standard-library backend is the fallback
//! when none of the optional engines is present.
//!
//! Probing only answers "is it there". If the chosen engine then fails to
//! build, that error is returned; there is no falling back to the next one.

use std::fmt;

use lazy_static::lazy_static;

use crate::config::FetcherConfig;
use crate::errors::FetchError;
use crate::net::backends::StdFetcher;
use crate::net::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// Session based client on `reqwest`
    Reqwest,
    /// libcurl bindings
    Curl,
    /// Lightweight client on `ureq`
    Ureq,
    /// `std::net` only, always available
    Std,
}

impl Engine {
    /// Optional engines, most preferred first.
    pub const PRIORITY: [Engine; 3] = [Engine::Reqwest, Engine::Curl, Engine::Ureq];

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Reqwest => "reqwest",
            Engine::Curl => "curl",
            Engine::Ureq => "ureq",
            Engine::Std => "stdlib",
        }
    }

    /// Whether the engine was compiled into this build.
    pub fn is_compiled(&self) -> bool {
        match self {
            Engine::Reqwest => cfg!(feature = "reqwest"),
            Engine::Curl => cfg!(feature = "curl"),
            Engine::Ureq => cfg!(feature = "ureq"),
            Engine::Std => true,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static! {
    static ref AVAILABLE: Vec<Engine> = {
        let found: Vec<Engine> = Engine::PRIORITY.into_iter().filter(Engine::is_compiled).collect();
        log::debug!("Available HTTP engines: {:?}", found);
        found
    };
}

/// Optional engines available in this build, in priority order.
pub fn available_engines() -> &'static [Engine] {
    &AVAILABLE
}

/// Picks the most preferred engine out of `available`, or [`Engine::Std`].
pub fn select_engine(available: &[Engine]) -> Engine {
    Engine::PRIORITY
        .into_iter()
        .find(|engine| available.contains(engine))
        .unwrap_or(Engine::Std)
}

/// Builds the preferred fetcher with the default configuration.
pub fn create_fetcher() -> Result<Box<dyn Fetcher>, FetchError> {
    create_fetcher_with_config(&FetcherConfig::default())
}

pub fn create_fetcher_with_config(config: &FetcherConfig) -> Result<Box<dyn Fetcher>, FetchError> {
    let engine = select_engine(available_engines());
    log::info!("Using the {} HTTP engine", engine);
    build_fetcher(engine, config)
}

/// Builds a fetcher on a specific engine.
pub fn build_fetcher(engine: Engine, config: &FetcherConfig) -> Result<Box<dyn Fetcher>, FetchError> {
    let config = config.clone();
    match engine {
        Engine::Std => Ok(Box::new(StdFetcher::new(config))),

        #[cfg(feature = "reqwest")]
        Engine::Reqwest => Ok(Box::new(crate::net::backends::ReqwestFetcher::new(config)?)),

        #[cfg(feature = "curl")]
        Engine::Curl => Ok(Box::new(crate::net::backends::CurlFetcher::new(config)?)),

        #[cfg(feature = "ureq")]
        Engine::Ureq => Ok(Box::new(crate::net::backends::UreqFetcher::new(config)?)),

        #[allow(unreachable_patterns)]
        other => Err(FetchError::EngineUnavailable(other)),
    }
}
