//! Error normalization.
//!
//! [`ExceptionWrappingFetcher`] decorates any [`Fetcher`] and turns the
//! backend's [`NativeError`]s into [`FetchError::Fetching`] or
//! [`FetchError::Protocol`]. This is the only module that looks inside
//! engine specific error types; everything above it sees the closed taxonomy.
//!
//! Errors unrelated to fetching ([`FetchError::Other`],
//! [`FetchError::EngineUnavailable`]) pass through untouched, as do panics.

#[cfg(any(feature = "reqwest", feature = "ureq"))]
use std::error::Error as StdError;
use std::io;

use http::HeaderMap;

use crate::errors::{FailureKind, FetchError, NativeError};
use crate::net::{Fetcher, Response};

/// Wraps one fetcher and normalizes its errors.
#[derive(Debug)]
pub struct ExceptionWrappingFetcher<F> {
    inner: F,
}

impl<F: Fetcher> ExceptionWrappingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: Fetcher> Fetcher for ExceptionWrappingFetcher<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        match self.inner.fetch(url, body, headers) {
            Err(FetchError::Native(err)) => {
                let err = normalize(err);
                log::debug!("{}: fetching {} failed: {}", self.inner.name(), url, err);
                Err(err)
            }
            other => other,
        }
    }

    fn wraps_errors(&self) -> bool {
        true
    }
}

/// Converts a backend error into its normalized form, keeping it as source.
pub fn normalize(err: NativeError) -> FetchError {
    match classify(&err) {
        Class::Failure(kind) => FetchError::Fetching {
            kind,
            source: Box::new(err),
        },
        Class::Protocol => FetchError::Protocol { source: Box::new(err) },
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Class {
    Failure(FailureKind),
    Protocol,
}

fn classify(err: &NativeError) -> Class {
    match err {
        NativeError::InvalidUrl { .. } => Class::Failure(FailureKind::InvalidUrl),
        NativeError::UnsupportedScheme(_) => Class::Failure(FailureKind::UnsupportedScheme),
        NativeError::TooManyRedirects(_) => Class::Failure(FailureKind::TooManyRedirects),
        NativeError::InvalidHeader(_) => Class::Failure(FailureKind::InvalidRequest),
        NativeError::MissingLocation { .. } | NativeError::MalformedResponse(_) => Class::Protocol,
        NativeError::Resolve { .. } => Class::Failure(FailureKind::Dns),
        NativeError::ConnectionClosed => Class::Failure(FailureKind::PrematureClose),
        NativeError::Io(e) => Class::Failure(io_failure(e.kind())),
        #[cfg(feature = "reqwest")]
        NativeError::Reqwest(e) => classify_reqwest(e),
        #[cfg(feature = "curl")]
        NativeError::Curl(e) => classify_curl(e),
        #[cfg(feature = "ureq")]
        NativeError::Ureq(e) => classify_ureq(e),
    }
}

fn io_failure(kind: io::ErrorKind) -> FailureKind {
    use io::ErrorKind::*;

    match kind {
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected | AddrNotAvailable
        | BrokenPipe => FailureKind::Connect,
        // Socket read timeouts surface as WouldBlock on Unix
        TimedOut | WouldBlock => FailureKind::Timeout,
        UnexpectedEof => FailureKind::PrematureClose,
        _ => FailureKind::Transport,
    }
}

#[cfg(any(feature = "reqwest", feature = "ureq"))]
fn chain<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Kind of the first `io::Error` found in the source chain.
#[cfg(any(feature = "reqwest", feature = "ureq"))]
fn io_kind_in_chain(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    chain(err).find_map(|e| e.downcast_ref::<io::Error>().map(io::Error::kind))
}

/// Whether any error in the chain mentions `needle` in its message.
#[cfg(any(feature = "reqwest", feature = "ureq"))]
fn chain_mentions(err: &(dyn StdError + 'static), needle: &str) -> bool {
    chain(err).any(|e| e.to_string().to_ascii_lowercase().contains(needle))
}

#[cfg(feature = "reqwest")]
fn classify_reqwest(e: &reqwest::Error) -> Class {
    if e.is_timeout() {
        return Class::Failure(FailureKind::Timeout);
    }
    if e.is_builder() {
        return Class::Failure(FailureKind::InvalidUrl);
    }
    if e.is_decode() {
        return Class::Protocol;
    }
    // reqwest does not expose hyper's error kinds, the messages are all we get
    if e.is_connect() {
        if chain_mentions(e, "dns error") {
            return Class::Failure(FailureKind::Dns);
        }
        return Class::Failure(FailureKind::Connect);
    }
    if let Some(kind) = io_kind_in_chain(e) {
        return Class::Failure(io_failure(kind));
    }
    if chain_mentions(e, "closed before message completed") {
        return Class::Failure(FailureKind::PrematureClose);
    }
    if chain_mentions(e, "parsed") || chain_mentions(e, "invalid http") {
        return Class::Protocol;
    }
    Class::Failure(FailureKind::Transport)
}

#[cfg(feature = "curl")]
fn classify_curl(e: &curl::Error) -> Class {
    // CURLE_WEIRD_SERVER_REPLY has no named accessor
    const CURLE_WEIRD_SERVER_REPLY: i32 = 8;

    if e.code() as i32 == CURLE_WEIRD_SERVER_REPLY {
        return Class::Protocol;
    }
    let kind = if e.is_unsupported_protocol() {
        FailureKind::UnsupportedScheme
    } else if e.is_url_malformed() {
        FailureKind::InvalidUrl
    } else if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        FailureKind::Dns
    } else if e.is_couldnt_connect() || e.is_send_error() || e.is_recv_error() || e.is_ssl_connect_error() {
        FailureKind::Connect
    } else if e.is_operation_timedout() {
        FailureKind::Timeout
    } else if e.is_got_nothing() || e.is_partial_file() {
        FailureKind::PrematureClose
    } else if e.is_too_many_redirects() {
        FailureKind::TooManyRedirects
    } else {
        FailureKind::Transport
    };
    Class::Failure(kind)
}

#[cfg(feature = "ureq")]
fn classify_ureq(e: &ureq::Error) -> Class {
    use ureq::ErrorKind;

    let transport = match e {
        ureq::Error::Transport(t) => t,
        // Statuses are turned into responses by the backend
        ureq::Error::Status(..) => return Class::Protocol,
    };
    let kind = match transport.kind() {
        ErrorKind::InvalidUrl => FailureKind::InvalidUrl,
        ErrorKind::UnknownScheme => FailureKind::UnsupportedScheme,
        ErrorKind::Dns => FailureKind::Dns,
        ErrorKind::ConnectionFailed => FailureKind::Connect,
        ErrorKind::TooManyRedirects => FailureKind::TooManyRedirects,
        ErrorKind::BadStatus | ErrorKind::BadHeader => return Class::Protocol,
        // ureq reports a peer that hung up before the status line as an
        // aborted connection saying "Unexpected EOF"
        ErrorKind::Io if chain_mentions(transport, "unexpected eof") => FailureKind::PrematureClose,
        ErrorKind::Io => io_kind_in_chain(transport)
            .map(io_failure)
            .unwrap_or(FailureKind::Transport),
        _ => FailureKind::Transport,
    };
    Class::Failure(kind)
}
