//! Fetcher backends, one per HTTP engine.
//!
//! The standard-library backend is always available; the others are compiled
//! in through the cargo feature of the same name.

pub mod stdlib;

/// Session based backend on `reqwest`'s blocking client
#[cfg(feature = "reqwest")]
pub mod reqwest;

/// libcurl backend
#[cfg(feature = "curl")]
pub mod curl;

/// Lightweight backend on `ureq`
#[cfg(feature = "ureq")]
pub mod ureq;

pub use stdlib::StdFetcher;

#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestFetcher;

#[cfg(feature = "curl")]
pub use self::curl::CurlFetcher;

#[cfg(feature = "ureq")]
pub use self::ureq::UreqFetcher;
