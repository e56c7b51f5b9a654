//! libcurl backend.
//!
//! Owns a single easy handle for its lifetime, so connections are reused
//! between fetches. The handle is not shareable between threads; concurrent
//! fetches on one `CurlFetcher` are serialized by a mutex. Use one fetcher per
//! worker for parallel fetching.

use std::sync::{Mutex, PoisonError};

use curl::easy::{Easy, List};
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::config::FetcherConfig;
use crate::errors::{FetchError, NativeError};
use crate::net::redirect::{self, Hop};
use crate::net::request::HTTP_SCHEMES;
use crate::net::{Fetcher, PreparedRequest, Response};

pub struct CurlFetcher {
    easy: Mutex<Easy>,
    config: FetcherConfig,
}

impl CurlFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, NativeError> {
        let mut easy = Easy::new();
        easy.signal(false)?;

        Ok(Self {
            easy: Mutex::new(easy),
            config,
        })
    }

    fn send(&self, request: &PreparedRequest) -> Result<Hop, NativeError> {
        let mut easy = self.easy.lock().unwrap_or_else(PoisonError::into_inner);
        easy.reset();

        easy.signal(false)?;
        easy.follow_location(false)?;
        easy.connect_timeout(self.config.connect_timeout)?;
        easy.timeout(self.config.timeout)?;
        easy.accept_encoding("identity")?;
        easy.url(request.url().as_str())?;

        let mut list = List::new();
        for (name, value) in request.headers() {
            let value = value
                .to_str()
                .map_err(|_| NativeError::InvalidHeader(format!("non-ASCII value for {}", name)))?;
            list.append(&format!("{}: {}", name, value))?;
        }
        if *request.method() == Method::POST {
            // libcurl would otherwise wait for "100 Continue" on larger bodies
            list.append("Expect:")?;
        }
        easy.http_headers(list)?;

        match request.body() {
            Some(body) => {
                easy.post(true)?;
                easy.post_fields_copy(body)?;
            }
            None => easy.get(true)?,
        }

        let limit = self.config.max_response_bytes;
        let mut body = Vec::new();
        let mut raw_headers: Vec<Vec<u8>> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                let room = limit.saturating_sub(body.len());
                body.extend_from_slice(&data[..data.len().min(room)]);
                Ok(data.len())
            })?;
            transfer.header_function(|line| {
                // A status line starts a new header block (e.g. after "100 Continue")
                if line.starts_with(b"HTTP/") {
                    raw_headers.clear();
                } else {
                    raw_headers.push(line.to_vec());
                }
                true
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()? as u16;
        let headers = parse_headers(&raw_headers)?;

        Ok(Hop { status, headers, body })
    }
}

impl Fetcher for CurlFetcher {
    fn name(&self) -> &str {
        "curl"
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        let request = PreparedRequest::new(url, body, headers, &self.config, HTTP_SCHEMES)?;
        let response = redirect::follow(request, self.config.max_redirects, HTTP_SCHEMES, |req| self.send(req))?;
        Ok(response)
    }
}

fn parse_headers(lines: &[Vec<u8>]) -> Result<HeaderMap, NativeError> {
    let mut headers = HeaderMap::new();
    for line in lines {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| NativeError::MalformedResponse(format!("bad header line {:?}", String::from_utf8_lossy(line))))?;
        let name = HeaderName::from_bytes(line[..colon].trim_ascii())
            .map_err(|e| NativeError::MalformedResponse(format!("bad header name: {}", e)))?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
            .map_err(|e| NativeError::MalformedResponse(format!("bad header value: {}", e)))?;
        headers.append(name, value);
    }
    Ok(headers)
}
