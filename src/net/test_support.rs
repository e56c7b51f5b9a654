//! Fixtures shared by the backend tests.
//!
//! [`check_contract`] runs the same checks against any backend, once bare and
//! once behind an [`ExceptionWrappingFetcher`], so all engines are held to the
//! same redirect and error behavior.

use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use http::header::{CONTENT_TYPE, DATE};
use http::{HeaderMap, HeaderValue};

use crate::config::FetcherConfig;
use crate::errors::{FailureKind, FetchError, NativeError};
use crate::net::{ExceptionWrappingFetcher, Fetcher, Response};

/// (path, status, redirect target)
const CASES: &[(&str, u16, Option<&str>)] = &[
    ("/success", 200, None),
    ("/301redirect", 301, Some("/success")),
    ("/302redirect", 302, Some("/success")),
    ("/303redirect", 303, Some("/success")),
    ("/307redirect", 307, Some("/success")),
    ("/notfound", 404, None),
    ("/badreq", 400, None),
    ("/forbidden", 403, None),
    ("/error", 500, None),
    ("/server_error", 503, None),
];

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn config() -> FetcherConfig {
    FetcherConfig::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// HTTP server answering the paths in [`CASES`] plus a few POST endpoints.
pub(crate) struct Fixture {
    server: mockito::ServerGuard,
    _mocks: Vec<mockito::Mock>,
}

impl Fixture {
    pub(crate) fn start() -> Self {
        let mut server = mockito::Server::new();
        let base = server.url();
        let mut mocks = Vec::new();

        for (path, status, location) in CASES {
            let mut mock = server
                .mock("GET", *path)
                .with_status(*status as usize)
                .with_header("content-type", "text/plain")
                .with_body(*path);
            if let Some(target) = location {
                mock = mock.with_header("location", &format!("{}{}", base, target));
            }
            mocks.push(mock.create());
        }

        mocks.push(
            server
                .mock("GET", "/loop")
                .with_status(302)
                .with_header("location", "/loop")
                .create(),
        );

        // Echo endpoints only match the expected content type and body
        mocks.push(
            server
                .mock("POST", "/echo")
                .match_header("content-type", "text/plain")
                .match_body("key=value")
                .with_status(200)
                .with_header("content-type", "text/plain")
                .with_body("key=value")
                .create(),
        );
        mocks.push(
            server
                .mock("POST", "/echo")
                .match_header("content-type", "application/x-www-form-urlencoded")
                .match_body("key=value")
                .with_status(200)
                .with_header("content-type", "application/x-www-form-urlencoded")
                .with_body("key=value")
                .create(),
        );
        mocks.push(
            server
                .mock("POST", "/303redirect")
                .match_body("key=value")
                .with_status(303)
                .with_header("location", "/success")
                .create(),
        );
        mocks.push(
            server
                .mock("POST", "/307redirect")
                .match_body("key=value")
                .with_status(307)
                .with_header("location", "/echo")
                .create(),
        );

        Self { server, _mocks: mocks }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }
}

/// Address of a server that accepts connections and closes them unanswered.
pub(crate) fn closing_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
        }
    });
    format!("http://{}/closed", addr)
}

/// Address nothing listens on.
pub(crate) fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/refused", addr)
}

/// Address of a server that accepts connections and never answers.
pub(crate) fn silent_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            held.push(stream);
        }
    });
    format!("http://{}/silent", addr)
}

/// Compares everything a downstream consumer looks at. `Date` may differ.
pub(crate) fn assert_same_response(expected: &Response, actual: &Response) {
    assert_eq!(expected.final_url(), actual.final_url());
    assert_eq!(expected.status(), actual.status());
    assert_eq!(expected.body(), actual.body());

    let strip = |headers: &HeaderMap| {
        let mut h = headers.clone();
        h.remove(DATE);
        h
    };
    assert_eq!(strip(expected.headers()), strip(actual.headers()));
}

pub(crate) fn check_contract<F, B>(build: B)
where
    F: Fetcher,
    B: Fn(FetcherConfig) -> F,
{
    init_logging();
    let fixture = Fixture::start();

    let bare = build(config());
    let wrapped = ExceptionWrappingFetcher::new(build(config()));

    for fetcher in [&bare as &dyn Fetcher, &wrapped as &dyn Fetcher] {
        check_redirects(fetcher, &fixture);
        check_terminal_statuses(fetcher, &fixture);
        check_post(fetcher, &fixture);
    }

    check_failures(&bare, false, &fixture);
    check_failures(&wrapped, true, &fixture);

    let impatient = FetcherConfig {
        timeout: Duration::from_secs(1),
        ..config()
    };
    check_timeout(&build(impatient.clone()), false);
    check_timeout(&ExceptionWrappingFetcher::new(build(impatient)), true);

    let small = build(FetcherConfig { max_response_bytes: 4, ..config() });
    let resp = small.fetch(&fixture.url("/success"), None, None).unwrap();
    assert_eq!(resp.body(), b"/suc");
}

fn check_redirects(fetcher: &dyn Fetcher, fixture: &Fixture) {
    let direct = fetcher.fetch(&fixture.url("/success"), None, None).unwrap();
    assert_eq!(direct.status(), 200);
    assert_eq!(direct.body(), b"/success");
    assert_eq!(direct.content_type(), Some("text/plain"));

    for path in ["/301redirect", "/302redirect", "/303redirect", "/307redirect"] {
        let resp = fetcher
            .fetch(&fixture.url(path), None, None)
            .unwrap_or_else(|e| panic!("{} {}: {}", fetcher.name(), path, e));
        assert_same_response(&direct, &resp);
    }
}

fn check_terminal_statuses(fetcher: &dyn Fetcher, fixture: &Fixture) {
    for (path, status) in [
        ("/notfound", 404),
        ("/badreq", 400),
        ("/forbidden", 403),
        ("/error", 500),
        ("/server_error", 503),
    ] {
        let resp = fetcher
            .fetch(&fixture.url(path), None, None)
            .unwrap_or_else(|e| panic!("{} {}: {}", fetcher.name(), path, e));
        assert_eq!(resp.status(), status);
        assert_eq!(resp.body(), path.as_bytes());
        assert_eq!(resp.final_url().as_str(), fixture.url(path));
        assert_eq!(resp.content_type(), Some("text/plain"));
    }
}

fn check_post(fetcher: &dyn Fetcher, fixture: &Fixture) {
    let resp = fetcher.fetch(&fixture.url("/echo"), Some(b"key=value"), None).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body(), b"key=value");
    assert_eq!(resp.content_type(), Some("text/plain"));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
    let resp = fetcher.fetch(&fixture.url("/echo"), Some(b"key=value"), Some(&headers)).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.content_type(), Some("application/x-www-form-urlencoded"));

    let direct = fetcher.fetch(&fixture.url("/success"), None, None).unwrap();
    let see_other = fetcher.fetch(&fixture.url("/303redirect"), Some(b"key=value"), None).unwrap();
    assert_same_response(&direct, &see_other);

    let temporary = fetcher.fetch(&fixture.url("/307redirect"), Some(b"key=value"), None).unwrap();
    assert_eq!(temporary.status(), 200);
    assert_eq!(temporary.body(), b"key=value");
    assert_eq!(temporary.final_url().as_str(), fixture.url("/echo"));
}

fn check_failures(fetcher: &dyn Fetcher, wrapped: bool, fixture: &Fixture) {
    let closed = closing_server_url();
    let refused = refused_url();
    let cases = [
        (closed.as_str(), Some(FailureKind::PrematureClose)),
        (refused.as_str(), Some(FailureKind::Connect)),
        ("http://invalid.invalid/", Some(FailureKind::Dns)),
        ("not:a/url", None),
        ("ftp://janrain.com/pub/", None),
        ("/relative", None),
    ];
    for (url, kind) in cases {
        let err = match fetcher.fetch(url, None, None) {
            Ok(resp) => panic!("{}: expected an error for {}, got status {}", fetcher.name(), url, resp.status()),
            Err(e) => e,
        };
        if wrapped {
            assert!(err.is_fetching_failure(), "{}: {} gave {:?}", fetcher.name(), url, err);
            if kind.is_some() {
                assert_eq!(err.kind(), kind, "{}: {} gave {:?}", fetcher.name(), url, err);
            }
        } else {
            assert!(matches!(err, FetchError::Native(_)), "{}: {} gave {:?}", fetcher.name(), url, err);
        }
    }

    let err = fetcher.fetch("ftp://janrain.com/pub/", None, None).unwrap_err();
    if wrapped {
        assert_eq!(err.kind(), Some(FailureKind::UnsupportedScheme));
    } else {
        assert!(matches!(err, FetchError::Native(NativeError::UnsupportedScheme(_))));
    }

    let err = fetcher.fetch(&fixture.url("/loop"), None, None).unwrap_err();
    if wrapped {
        assert_eq!(err.kind(), Some(FailureKind::TooManyRedirects));
    } else {
        assert!(matches!(err, FetchError::Native(NativeError::TooManyRedirects(_))));
    }
}

fn check_timeout(fetcher: &dyn Fetcher, wrapped: bool) {
    let url = silent_server_url();
    let err = match fetcher.fetch(&url, None, None) {
        Ok(resp) => panic!("{}: expected a timeout, got status {}", fetcher.name(), resp.status()),
        Err(e) => e,
    };
    if wrapped {
        assert_eq!(err.kind(), Some(FailureKind::Timeout), "{}: {:?}", fetcher.name(), err);
    } else {
        assert!(matches!(err, FetchError::Native(_)), "{}: {:?}", fetcher.name(), err);
    }
}
