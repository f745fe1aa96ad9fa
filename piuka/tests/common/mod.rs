//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use piuka::transport::{BoxFuture, CONTENT_LENGTH, RANGE};
use piuka::{HeaderSet, HttpRequest, HttpResponse, Transport, TransportError};

// ============================================================================
// Fake Transport
// ============================================================================

#[derive(Clone)]
struct Fixture {
    body: Bytes,
    status: u16,
    /// Calls still to fail with a connection error.
    failures: u32,
    /// Ranged GETs still to fail, keyed by `range` header value.
    range_failures: HashMap<String, u32>,
    advertise_length: bool,
    honor_range: bool,
}

/// Scripted in-process server.
///
/// Serves registered fixtures by URL; unknown URLs answer 404. Tracks
/// concurrent in-flight calls so tests can check the worker bound.
#[derive(Default)]
pub struct FakeTransport {
    fixtures: Mutex<HashMap<String, Fixture>>,
    delay: Duration,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.fixtures.lock().insert(
            url.to_string(),
            Fixture {
                body: body.into(),
                status: 200,
                failures: 0,
                range_failures: HashMap::new(),
                advertise_length: true,
                honor_range: true,
            },
        );
        self
    }

    /// Fails the first `failures` calls to `url` with a connection error.
    pub fn failing(self, url: &str, failures: u32) -> Self {
        self.update(url, |f| f.failures = failures);
        self
    }

    /// Fails the first `failures` ranged GETs for `range` (for example
    /// `"bytes=0-99"`) with a connection error.
    pub fn failing_range(self, url: &str, range: &str, failures: u32) -> Self {
        self.update(url, |f| {
            f.range_failures.insert(range.to_string(), failures);
        });
        self
    }

    /// Answers every call to `url` with `status` and an empty body.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.update(url, |f| f.status = status);
        self
    }

    /// Omits `content-length` from probe responses.
    pub fn without_length(self, url: &str) -> Self {
        self.update(url, |f| f.advertise_length = false);
        self
    }

    /// Answers ranged GETs with the whole body.
    pub fn ignoring_range(self, url: &str) -> Self {
        self.update(url, |f| f.honor_range = false);
        self
    }

    /// Delays every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.head_calls() + self.get_calls()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// `range` header values sent, in order.
    pub fn ranges(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r.headers.get(RANGE).map(str::to_string))
            .collect()
    }

    fn update(&self, url: &str, apply: impl FnOnce(&mut Fixture)) {
        let mut fixtures = self.fixtures.lock();
        let fixture = fixtures
            .get_mut(url)
            .unwrap_or_else(|| panic!("no fixture registered for {}", url));
        apply(fixture);
    }

    async fn respond(&self, request: &HttpRequest, head: bool) -> Result<HttpResponse, TransportError> {
        let _in_flight = InFlight::enter(self);
        self.requests.lock().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let fixture = {
            let mut fixtures = self.fixtures.lock();
            match fixtures.get_mut(&request.url) {
                Some(fixture) if fixture.failures > 0 => {
                    fixture.failures -= 1;
                    return Err(refused(request));
                }
                Some(fixture) => {
                    let remaining = request
                        .headers
                        .get(RANGE)
                        .and_then(|range| fixture.range_failures.get_mut(range))
                        .filter(|remaining| **remaining > 0);
                    if let Some(remaining) = remaining {
                        *remaining -= 1;
                        return Err(refused(request));
                    }
                    fixture.clone()
                }
                None => return Ok(HttpResponse::new(404, HeaderSet::new(), Bytes::new())),
            }
        };

        if !(200..300).contains(&fixture.status) {
            return Ok(HttpResponse::new(fixture.status, HeaderSet::new(), Bytes::new()));
        }

        if head {
            let mut headers = HeaderSet::new();
            if fixture.advertise_length {
                headers.insert(CONTENT_LENGTH, fixture.body.len().to_string());
            }
            return Ok(HttpResponse::new(200, headers, Bytes::new()));
        }

        match request.headers.get(RANGE) {
            Some(range) if fixture.honor_range => {
                let (start, end) = parse_range(range);
                let end = end.min(fixture.body.len() - 1);
                Ok(HttpResponse::new(
                    206,
                    HeaderSet::new(),
                    fixture.body.slice(start..=end),
                ))
            }
            _ => Ok(HttpResponse::new(200, HeaderSet::new(), fixture.body.clone())),
        }
    }
}

impl Transport for FakeTransport {
    fn head<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(self.respond(request, true))
    }

    fn get<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(self.respond(request, false))
    }
}

/// Counts a call as in flight until dropped, including when cancelled.
struct InFlight<'a> {
    transport: &'a FakeTransport,
}

impl<'a> InFlight<'a> {
    fn enter(transport: &'a FakeTransport) -> Self {
        let now = transport.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        transport.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { transport }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.transport.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn refused(request: &HttpRequest) -> TransportError {
    TransportError::Connect {
        url: request.url.clone(),
        reason: "connection refused".to_string(),
    }
}

fn parse_range(value: &str) -> (usize, usize) {
    let bounds = value.trim_start_matches("bytes=");
    let (start, end) = bounds.split_once('-').expect("range has a dash");
    (
        start.parse().expect("numeric range start"),
        end.parse().expect("numeric range end"),
    )
}

/// Transport whose every call panics.
pub struct PanickingTransport;

impl Transport for PanickingTransport {
    fn head<'a>(
        &'a self,
        _request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        panic!("transport panicked on HEAD")
    }

    fn get<'a>(
        &'a self,
        _request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        panic!("transport panicked on GET")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Deterministic body of `len` bytes.
pub fn fixture_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Polls `condition` every 5ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
