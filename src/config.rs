//! Fetcher configuration.
//!
//! `FetcherConfig` is shared by every backend. It provides defaults via
//! [`Default`] and a fluent [`FetcherConfig::builder()`] with validation.
//!
//! ```rust
//! use std::time::Duration;
//! use openid_fetchers::FetcherConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = FetcherConfig::builder()
//!     .user_agent("my-relying-party/1.0")
//!     .timeout(Duration::from_secs(5))
//!     .max_redirects(5)
//!     .build()?;
//! assert_eq!(cfg.max_redirects, 5);
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `user_agent`: sent with every request unless the caller overrides it.
//! - `connect_timeout`: limit for establishing a connection.
//! - `timeout`: limit for a single request hop (not the whole redirect chain).
//! - `max_redirects`: redirect hops followed before giving up (default: 10).
//! - `max_response_bytes`: bodies are truncated past this size (default: 1 MiB).

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = concat!("openid-fetchers/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub max_response_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl FetcherConfig {
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: FetcherConfig = serde_json::from_str(json)?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetcherConfigBuilder {
    inner: FetcherConfig,
}

impl FetcherConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut FetcherConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn connect_timeout(self, d: Duration) -> Self { self.map(|c| c.connect_timeout = d) }
    pub fn timeout(self, d: Duration) -> Self { self.map(|c| c.timeout = d) }
    pub fn max_redirects(self, n: usize) -> Self { self.map(|c| c.max_redirects = n) }
    pub fn max_response_bytes(self, n: usize) -> Self { self.map(|c| c.max_response_bytes = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut FetcherConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<FetcherConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("User agent must be a non-empty, visible ASCII string")]
    InvalidUserAgent,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("max_response_bytes must be greater than zero")]
    ZeroResponseLimit,

    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn validate(cfg: &FetcherConfig) -> Result<(), ConfigError> {
    if cfg.user_agent.is_empty() || http::HeaderValue::from_str(&cfg.user_agent).is_err() {
        return Err(ConfigError::InvalidUserAgent);
    }
    if cfg.connect_timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout("connect_timeout"));
    }
    if cfg.timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout("timeout"));
    }
    if cfg.max_response_bytes == 0 {
        return Err(ConfigError::ZeroResponseLimit);
    }
    Ok(())
}
