//! Request, response and header types shared by transport implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::download::ByteRange;

/// Header carrying the requested byte range.
pub const RANGE: &str = "range";

/// Header carrying the resource size on probe responses.
pub const CONTENT_LENGTH: &str = "content-length";

/// Header identifying the client.
pub const USER_AGENT: &str = "user-agent";

/// Returns the user agent sent when the configuration does not provide one.
pub fn default_user_agent() -> String {
    format!("Piuka/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Header Set
// =============================================================================

/// Case-insensitive header map.
///
/// Names are normalized to lowercase on insertion, so `User-Agent` and
/// `user-agent` address the same entry. Iteration order is sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: BTreeMap<String, String>,
}

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, returning the previous value for that name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value for a header name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Inserts the default user agent unless one is already set.
    pub fn with_default_user_agent(mut self) -> Self {
        if !self.contains(USER_AGENT) {
            self.insert(USER_AGENT, default_user_agent());
        }
        self
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs with lowercase names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderSet::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// =============================================================================
// Request / Response
// =============================================================================

/// A single HEAD or GET request handed to a [`Transport`](super::Transport).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL of the resource.
    pub url: String,
    /// Headers to send, already merged with the engine defaults.
    pub headers: HeaderSet,
    /// Upper bound for the whole request.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Creates a request.
    pub fn new(url: impl Into<String>, headers: HeaderSet, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers,
            timeout,
        }
    }

    /// Returns a copy of this request restricted to an inclusive byte range.
    pub fn with_range(&self, range: ByteRange) -> Self {
        let mut request = self.clone();
        request.headers.insert(RANGE, range.header_value());
        request
    }
}

/// Response returned by a transport.
///
/// HEAD responses carry an empty body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: HeaderSet,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, headers: HeaderSet, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the `content-length` header, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failure below the HTTP layer: the request produced no response.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// The connection could not be established.
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Any other request failure (invalid header, body read error, ...).
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

impl TransportError {
    /// Returns the URL the failed request targeted.
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Connect { url, .. } | Self::Request { url, .. } => {
                url
            }
        }
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.headers.get(RANGE) {
            Some(range) => write!(f, "{} [{}]", self.url, range),
            None => write!(f, "{}", self.url),
        }
    }
}
