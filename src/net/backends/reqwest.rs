use std::io::Read;

use http::HeaderMap;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::config::FetcherConfig;
use crate::errors::{FetchError, NativeError};
use crate::net::redirect::{self, Hop};
use crate::net::request::HTTP_SCHEMES;
use crate::net::{Fetcher, PreparedRequest, Response};

/// Fetcher on a blocking `reqwest` client.
///
/// The client is a session: connections are pooled and cookies set by one
/// response are sent with later requests to the same site. Its own redirect
/// handling is disabled in favor of the shared redirect driver.
///
/// Must not be constructed or used from within an async runtime.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    config: FetcherConfig,
}

impl ReqwestFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, NativeError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn send(&self, request: &PreparedRequest) -> Result<Hop, NativeError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // Bodies past max_response_bytes are cut off
        let mut body = Vec::new();
        response
            .take(self.config.max_response_bytes as u64)
            .read_to_end(&mut body)?;

        Ok(Hop { status, headers, body })
    }
}

impl Fetcher for ReqwestFetcher {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        let request = PreparedRequest::new(url, body, headers, &self.config, HTTP_SCHEMES)?;
        let response = redirect::follow(request, self.config.max_redirects, HTTP_SCHEMES, |req| self.send(req))?;
        Ok(response)
    }
}
