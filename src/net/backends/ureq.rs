use std::io::Read;

use http::{HeaderMap, HeaderName, HeaderValue};
use ureq::{Agent, AgentBuilder};

use crate::config::FetcherConfig;
use crate::errors::{FetchError, NativeError};
use crate::net::redirect::{self, Hop};
use crate::net::request::HTTP_SCHEMES;
use crate::net::{Fetcher, PreparedRequest, Response};

/// Fetcher on a `ureq` agent. Pools connections, keeps no cookies.
#[derive(Debug, Clone)]
pub struct UreqFetcher {
    agent: Agent,
    config: FetcherConfig,
}

impl UreqFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, NativeError> {
        let agent = AgentBuilder::new()
            .redirects(0)
            .timeout_connect(config.connect_timeout)
            .timeout(config.timeout)
            .build();

        Ok(Self { agent, config })
    }

    fn send(&self, request: &PreparedRequest) -> Result<Hop, NativeError> {
        let mut req = self.agent.request_url(request.method().as_str(), request.url());
        for (name, value) in request.headers() {
            let value = value
                .to_str()
                .map_err(|_| NativeError::InvalidHeader(format!("non-ASCII value for {}", name)))?;
            req = req.set(name.as_str(), value);
        }

        let result = match request.body() {
            Some(body) => req.send_bytes(body),
            None => req.call(),
        };
        // 4xx and 5xx come back as errors, they are ordinary responses here
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let mut headers = HeaderMap::new();
        for name in response.headers_names() {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| NativeError::MalformedResponse(format!("bad header name: {}", e)))?;
            for value in response.all(&name) {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| NativeError::MalformedResponse(format!("bad header value: {}", e)))?;
                headers.append(header.clone(), value);
            }
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.config.max_response_bytes as u64)
            .read_to_end(&mut body)?;

        Ok(Hop { status, headers, body })
    }
}

impl Fetcher for UreqFetcher {
    fn name(&self) -> &str {
        "ureq"
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        let request = PreparedRequest::new(url, body, headers, &self.config, HTTP_SCHEMES)?;
        let response = redirect::follow(request, self.config.max_redirects, HTTP_SCHEMES, |req| self.send(req))?;
        Ok(response)
    }
}
