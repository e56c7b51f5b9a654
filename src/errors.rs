//! Error taxonomy for the fetcher layer.
//!
//! Two levels exist:
//!
//! - [`NativeError`] is what a backend produces. Every engine has its own
//!   variant, next to a handful of failures detected by the shared request
//!   and redirect code.
//! - [`FetchError`] is what callers see. Above an
//!   [`ExceptionWrappingFetcher`](crate::net::ExceptionWrappingFetcher) only the
//!   normalized variants ([`FetchError::Fetching`] and [`FetchError::Protocol`])
//!   and unrelated defects can appear.
//!
//! A well-formed HTTP response is never an error, whatever its status code.

use std::fmt;

use crate::net::Engine;

/// Classification of a normalized fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The URL could not be parsed or is not absolute.
    InvalidUrl,
    /// The URL scheme is not supported by the backend.
    UnsupportedScheme,
    /// The request could not be expressed on the wire (e.g. a header value
    /// the engine refuses).
    InvalidRequest,
    /// The host name could not be resolved.
    Dns,
    /// The connection was refused, reset or aborted.
    Connect,
    /// A connect or read timeout expired.
    Timeout,
    /// The peer closed the connection before a complete response arrived.
    PrematureClose,
    /// The redirect chain exceeded the configured limit.
    TooManyRedirects,
    /// Any other transport level failure.
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::InvalidUrl => "invalid URL",
            FailureKind::UnsupportedScheme => "unsupported URL scheme",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::Dns => "name resolution failed",
            FailureKind::Connect => "connection failed",
            FailureKind::Timeout => "timed out",
            FailureKind::PrematureClose => "connection closed prematurely",
            FailureKind::TooManyRedirects => "too many redirects",
            FailureKind::Transport => "transport error",
        };
        f.write_str(s)
    }
}

/// Errors as produced by a backend, before normalization.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Bad URL scheme: {0:?}")]
    UnsupportedScheme(String),

    #[error("Too many redirects (limit is {0})")]
    TooManyRedirects(usize),

    #[error("Redirect status {status} without a usable Location header")]
    MissingLocation { status: u16 },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Cannot resolve host {host:?}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed before a response was received")]
    ConnectionClosed,

    #[error("Malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "reqwest")]
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[cfg(feature = "curl")]
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),

    #[cfg(feature = "ureq")]
    #[error("ureq: {0}")]
    Ureq(Box<ureq::Error>),
}

#[cfg(feature = "ureq")]
impl From<ureq::Error> for NativeError {
    fn from(e: ureq::Error) -> Self {
        NativeError::Ureq(Box::new(e))
    }
}

/// Errors returned by [`Fetcher::fetch`](crate::net::Fetcher::fetch) and the
/// default-fetcher functions.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Normalized fetch failure. The original backend error is kept as source.
    #[error("HTTP fetching failed ({kind}): {source}")]
    Fetching {
        kind: FailureKind,
        #[source]
        source: Box<NativeError>,
    },

    /// Normalized failure where the backend received an HTTP exchange it
    /// could not interpret.
    #[error("HTTP protocol error: {source}")]
    Protocol {
        #[source]
        source: Box<NativeError>,
    },

    /// Backend error that has not been normalized (wrapping disabled).
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("HTTP engine {0} is not compiled in")]
    EngineUnavailable(Engine),

    /// Anything unrelated to fetching. Never normalized.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    /// True for both normalized variants, the protocol anomaly being a
    /// special case of a fetch failure.
    pub fn is_fetching_failure(&self) -> bool {
        matches!(self, FetchError::Fetching { .. } | FetchError::Protocol { .. })
    }

    pub fn is_protocol_error(&self) -> bool {
        matches!(self, FetchError::Protocol { .. })
    }

    /// Failure classification of a normalized error.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            FetchError::Fetching { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The backend error behind this one, normalized or not.
    pub fn why(&self) -> Option<&NativeError> {
        match self {
            FetchError::Fetching { source, .. } | FetchError::Protocol { source } => Some(source.as_ref()),
            FetchError::Native(e) => Some(e),
            _ => None,
        }
    }
}
