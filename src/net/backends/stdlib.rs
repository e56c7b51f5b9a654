//! Standard-library backend.
//!
//! Speaks HTTP/1.1 over a plain [`TcpStream`]: one connection per hop, sent
//! with `Connection: close` and dropped once the response is read. There is
//! no TLS, so only `http` URLs are accepted.
//!
//! Responses may be framed by `Content-Length`, chunked transfer coding, or
//! the connection closing. Interim `1xx` responses are skipped.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::FetcherConfig;
use crate::errors::{FetchError, NativeError};
use crate::net::redirect::{self, Hop};
use crate::net::request::PLAIN_HTTP_SCHEMES;
use crate::net::{Fetcher, PreparedRequest, Response};

const MAX_LINE_BYTES: u64 = 16 * 1024;
const MAX_HEADERS: usize = 128;

/// Fetcher built on `std::net` only.
#[derive(Debug, Clone, Default)]
pub struct StdFetcher {
    config: FetcherConfig,
}

impl StdFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    fn send(&self, request: &PreparedRequest) -> Result<Hop, NativeError> {
        let url = request.url();
        let host = url.host_str().unwrap_or_default();

        let addrs = url
            .socket_addrs(|| None)
            .map_err(|source| NativeError::Resolve {
                host: host.to_string(),
                source,
            })?;
        if addrs.is_empty() {
            return Err(NativeError::Resolve {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        let stream = connect(&addrs, self.config.connect_timeout)?;
        stream.set_read_timeout(Some(self.config.timeout))?;
        stream.set_write_timeout(Some(self.config.timeout))?;

        let mut writer = &stream;
        write_request(&mut writer, request)?;

        let mut reader = BufReader::new(&stream);
        read_response(&mut reader, self.config.max_response_bytes)
    }
}

impl Fetcher for StdFetcher {
    fn name(&self) -> &str {
        "stdlib"
    }

    fn fetch(&self, url: &str, body: Option<&[u8]>, headers: Option<&HeaderMap>) -> Result<Response, FetchError> {
        let request = PreparedRequest::new(url, body, headers, &self.config, PLAIN_HTTP_SCHEMES)?;
        let response = redirect::follow(request, self.config.max_redirects, PLAIN_HTTP_SCHEMES, |req| {
            self.send(req)
        })?;
        Ok(response)
    }
}

fn connect(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream, NativeError> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("stdlib: connecting to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
        .into())
}

fn write_request<W: Write>(out: &mut W, request: &PreparedRequest) -> io::Result<()> {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = url.host_str().unwrap_or_default();
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut head = Vec::with_capacity(512);
    write!(head, "{} {} HTTP/1.1\r\n", request.method(), target)?;
    write!(head, "Host: {}\r\n", host)?;
    head.extend_from_slice(b"Connection: close\r\n");

    for (name, value) in request.headers() {
        // Framing headers are ours to set
        if [HOST, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING].contains(name) {
            continue;
        }
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }

    if let Some(body) = request.body() {
        write!(head, "Content-Length: {}\r\n\r\n", body.len())?;
        head.extend_from_slice(body);
    } else {
        head.extend_from_slice(b"\r\n");
    }

    out.write_all(&head)?;
    out.flush()
}

fn read_response<R: BufRead>(reader: &mut R, limit: usize) -> Result<Hop, NativeError> {
    loop {
        let status_line = read_line(reader)?.ok_or(NativeError::ConnectionClosed)?;
        let status = parse_status_line(&status_line)?;
        let headers = read_headers(reader)?;

        if (100..200).contains(&status) {
            continue;
        }

        let body = read_body(reader, &headers, status, limit)?;
        return Ok(Hop { status, headers, body });
    }
}

/// One CRLF (or bare LF) terminated line without its terminator.
/// `None` on a clean end of stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, NativeError> {
    let mut line = Vec::new();
    let n = (&mut *reader).take(MAX_LINE_BYTES).read_until(b'\n', &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        if n as u64 == MAX_LINE_BYTES {
            return Err(NativeError::MalformedResponse("line too long".into()));
        }
        return Err(unexpected_eof());
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_status_line(line: &[u8]) -> Result<u16, NativeError> {
    let malformed = || NativeError::MalformedResponse(format!("bad status line {:?}", String::from_utf8_lossy(line)));

    let line = std::str::from_utf8(line).map_err(|_| malformed())?;
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();

    if !version.starts_with("HTTP/1.") || code.len() != 3 {
        return Err(malformed());
    }
    match code.parse::<u16>() {
        Ok(status) if status >= 100 => Ok(status),
        _ => Err(malformed()),
    }
}

fn read_headers<R: BufRead>(reader: &mut R) -> Result<HeaderMap, NativeError> {
    let mut headers = HeaderMap::new();
    loop {
        let line = read_line(reader)?.ok_or_else(unexpected_eof)?;
        if line.is_empty() {
            return Ok(headers);
        }
        if headers.len() >= MAX_HEADERS {
            return Err(NativeError::MalformedResponse("too many headers".into()));
        }

        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| NativeError::MalformedResponse(format!("bad header line {:?}", String::from_utf8_lossy(&line))))?;
        let name = HeaderName::from_bytes(line[..colon].trim_ascii())
            .map_err(|e| NativeError::MalformedResponse(format!("bad header name: {}", e)))?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
            .map_err(|e| NativeError::MalformedResponse(format!("bad header value: {}", e)))?;
        headers.append(name, value);
    }
}

fn read_body<R: BufRead>(reader: &mut R, headers: &HeaderMap, status: u16, limit: usize) -> Result<Vec<u8>, NativeError> {
    if status == 204 || status == 304 {
        return Ok(Vec::new());
    }

    let chunked = headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return read_chunked(reader, limit);
    }

    let mut body = Vec::new();
    match content_length(headers)? {
        Some(len) => {
            let want = len.min(limit as u64);
            (&mut *reader).take(want).read_to_end(&mut body)?;
            if (body.len() as u64) < want {
                return Err(unexpected_eof());
            }
        }
        None => {
            (&mut *reader).take(limit as u64).read_to_end(&mut body)?;
        }
    }
    Ok(body)
}

fn content_length(headers: &HeaderMap) -> Result<Option<u64>, NativeError> {
    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| NativeError::MalformedResponse("bad Content-Length".into()))?;
        if length.is_some_and(|l| l != parsed) {
            return Err(NativeError::MalformedResponse("conflicting Content-Length".into()));
        }
        length = Some(parsed);
    }
    Ok(length)
}

fn read_chunked<R: BufRead>(reader: &mut R, limit: usize) -> Result<Vec<u8>, NativeError> {
    let mut body = Vec::new();
    loop {
        let line = read_line(reader)?.ok_or_else(unexpected_eof)?;
        let size = std::str::from_utf8(&line)
            .ok()
            .and_then(|l| l.split(';').next())
            .and_then(|s| u64::from_str_radix(s.trim(), 16).ok())
            .ok_or_else(|| NativeError::MalformedResponse("bad chunk size".into()))?;

        if size == 0 {
            // Trailers are read and discarded
            while let Some(trailer) = read_line(reader)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        let room = limit.saturating_sub(body.len()) as u64;
        let keep = size.min(room);
        let before = body.len();
        (&mut *reader).take(keep).read_to_end(&mut body)?;
        if ((body.len() - before) as u64) < keep {
            return Err(unexpected_eof());
        }
        if keep < size {
            // Truncated, the rest of the stream is dropped with the connection
            return Ok(body);
        }

        match read_line(reader)? {
            Some(crlf) if crlf.is_empty() => {}
            Some(_) => return Err(NativeError::MalformedResponse("missing chunk terminator".into())),
            None => return Err(unexpected_eof()),
        }
    }
}

fn unexpected_eof() -> NativeError {
    NativeError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid-response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::test_support;
    use std::io::Cursor;

    fn parse(raw: &str, limit: usize) -> Result<Hop, NativeError> {
        read_response(&mut Cursor::new(raw.as_bytes().to_vec()), limit)
    }

    #[test]
    fn content_length_body() {
        let hop = parse("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello trailing", 1024).unwrap();
        assert_eq!(hop.status, 200);
        assert_eq!(hop.headers["content-type"], "text/plain");
        assert_eq!(hop.body, b"hello");
    }

    #[test]
    fn body_until_close() {
        let hop = parse("HTTP/1.0 404 Not Found\r\n\r\nmissing", 1024).unwrap();
        assert_eq!(hop.status, 404);
        assert_eq!(hop.body, b"missing");
    }

    #[test]
    fn chunked_body() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\nX-Trailer: 1\r\n\r\n";
        let hop = parse(raw, 1024).unwrap();
        assert_eq!(hop.body, b"Wikipedia");
    }

    #[test]
    fn bodies_are_truncated_at_limit() {
        let hop = parse("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789", 4).unwrap();
        assert_eq!(hop.body, b"0123");

        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        let hop = parse(raw, 6).unwrap();
        assert_eq!(hop.body, b"Wikipe");
    }

    #[test]
    fn interim_responses_are_skipped() {
        let hop = parse("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok", 1024).unwrap();
        assert_eq!(hop.status, 201);
        assert_eq!(hop.body, b"ok");
    }

    #[test]
    fn empty_stream_is_connection_closed() {
        assert!(matches!(parse("", 1024), Err(NativeError::ConnectionClosed)));
    }

    #[test]
    fn truncated_body_is_unexpected_eof() {
        let err = parse("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort", 1024).unwrap_err();
        assert!(matches!(err, NativeError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(parse("SSH-2.0-OpenSSH\r\n\r\n", 1024), Err(NativeError::MalformedResponse(_))));
        assert!(matches!(parse("HTTP/1.1 2000 OK\r\n\r\n", 1024), Err(NativeError::MalformedResponse(_))));
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\nno colon here\r\n\r\n", 1024),
            Err(NativeError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse("HTTP/1.1 200 OK\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\nxx", 1024),
            Err(NativeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn request_is_written_with_framing() {
        let req = PreparedRequest::new(
            "http://127.0.0.1:8080/path?q=1",
            Some(b"key=value"),
            None,
            &FetcherConfig::default(),
            PLAIN_HTTP_SCHEMES,
        )
        .unwrap();
        let mut out = Vec::new();
        write_request(&mut out, &req).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("POST /path?q=1 HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nConnection: close\r\n"));
        assert!(text.contains("content-type: text/plain\r\n"));
        assert!(text.ends_with("Content-Length: 9\r\n\r\nkey=value"));
    }

    #[test]
    fn https_is_unsupported() {
        let err = StdFetcher::default().fetch("https://op.example/", None, None).unwrap_err();
        assert!(matches!(err, FetchError::Native(NativeError::UnsupportedScheme(s)) if s == "https"));
    }

    #[test]
    fn contract() {
        test_support::check_contract(StdFetcher::new);
    }
}
