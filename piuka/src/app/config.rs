//! Engine configuration.
//!
//! [`EngineConfig`] is built in code with `with_*` methods or loaded from an
//! INI file:
//!
//! ```ini
//! [engine]
//! ; whole seconds per request
//! timeout = 2
//! workers = 8
//! ; chunk threshold in bytes
//! flush = 104857600
//! max_attempts = 10
//! dispatch_interval_ms = 100
//!
//! [headers]
//! Referer = https://example.com
//!
//! [proxies]
//! https = http://proxy.local:3128
//! ```
//!
//! Missing keys keep their defaults.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::warn;

use super::error::ConfigError;
use crate::executor::{RetryPolicy, DEFAULT_DISPATCH_INTERVAL};
use crate::transport::{HeaderSet, PROXY_SCHEMES};

/// Default per-request timeout (2 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default chunking threshold (100 MiB).
pub const DEFAULT_FLUSH_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Worker count used when host parallelism cannot be determined.
pub const FALLBACK_WORKERS: usize = 4;

const ENGINE_SECTION: &str = "engine";
const HEADERS_SECTION: &str = "headers";
const PROXIES_SECTION: &str = "proxies";

/// Configuration for an [`Engine`](super::Engine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Scheme (`http`, `https`, `all`) to proxy URI.
    pub proxies: HashMap<String, String>,

    /// Headers sent with every request. A default user agent is added at
    /// engine start if none is set.
    pub headers: HeaderSet,

    /// Per-request timeout used when a submission does not override it.
    pub timeout: Duration,

    /// Number of worker slots.
    pub workers: usize,

    /// Resources are split into `max(1, length / flush_threshold)` chunks.
    pub flush_threshold: u64,

    /// Retry behavior for every request phase.
    pub retry: RetryPolicy,

    /// Fallback tick of the dispatcher.
    pub dispatch_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proxies: HashMap::new(),
            headers: HeaderSet::new(),
            timeout: DEFAULT_TIMEOUT,
            workers: default_workers(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            retry: RetryPolicy::default(),
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
        }
    }
}

/// Host parallelism, or [`FALLBACK_WORKERS`] if unknown.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_WORKERS)
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_flush_threshold(mut self, bytes: u64) -> Self {
        self.flush_threshold = bytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dispatch_interval(mut self, interval: Duration) -> Self {
        self.dispatch_interval = interval;
        self
    }

    /// Adds a header. Names are case-insensitive.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    /// Routes `scheme` traffic through `uri`.
    pub fn with_proxy(mut self, scheme: impl Into<String>, uri: impl Into<String>) -> Self {
        self.proxies.insert(scheme.into(), uri.into());
        self
    }

    /// Headers actually sent: the configured set plus a default user agent.
    pub fn effective_headers(&self) -> HeaderSet {
        self.headers.clone().with_default_user_agent()
    }

    /// Checks every value the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::InvalidFlushThreshold);
        }
        if self.retry.max_attempts() == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.dispatch_interval.is_zero() {
            return Err(ConfigError::InvalidDispatchInterval);
        }
        for scheme in self.proxies.keys() {
            if !PROXY_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::UnsupportedProxyScheme(scheme.clone()));
            }
        }
        Ok(())
    }

    // =========================================================================
    // INI loading
    // =========================================================================

    /// Loads and validates a configuration file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini_str(&contents)
    }

    /// Parses and validates INI text. Missing keys keep their defaults.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(engine) = ini.section(Some(ENGINE_SECTION)) {
            for (key, value) in engine.iter() {
                match key {
                    "timeout" => {
                        let secs: u64 = parse_value(ENGINE_SECTION, key, value)?;
                        if secs == 0 {
                            return Err(ConfigError::InvalidTimeout);
                        }
                        config.timeout = Duration::from_secs(secs);
                    }
                    "workers" => config.workers = parse_value(ENGINE_SECTION, key, value)?,
                    "flush" => config.flush_threshold = parse_value(ENGINE_SECTION, key, value)?,
                    "max_attempts" => {
                        let attempts = parse_value(ENGINE_SECTION, key, value)?;
                        config.retry = config.retry.with_max_attempts(attempts);
                    }
                    "dispatch_interval_ms" => {
                        let ms = parse_value(ENGINE_SECTION, key, value)?;
                        config.dispatch_interval = Duration::from_millis(ms);
                    }
                    other => warn!(key = other, "Ignoring unknown [engine] key"),
                }
            }
        }

        if let Some(headers) = ini.section(Some(HEADERS_SECTION)) {
            for (name, value) in headers.iter() {
                config.headers.insert(name, value);
            }
        }

        if let Some(proxies) = ini.section(Some(PROXIES_SECTION)) {
            for (scheme, uri) in proxies.iter() {
                config
                    .proxies
                    .insert(scheme.to_ascii_lowercase(), uri.to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}
