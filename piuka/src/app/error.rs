//! Application error types.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or unloadable engine configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("worker count must be at least 1")]
    InvalidWorkers,

    #[error("flush threshold must be at least 1 byte")]
    InvalidFlushThreshold,

    #[error("retry policy must allow at least one attempt")]
    InvalidMaxAttempts,

    #[error("dispatch interval must be greater than zero")]
    InvalidDispatchInterval,

    #[error("unsupported proxy scheme '{0}' (expected http, https or all)")]
    UnsupportedProxyScheme(String),

    #[error("invalid proxy URI '{uri}': {reason}")]
    InvalidProxy { uri: String, reason: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Rejected submission. Nothing from the rejected batch was enqueued.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("got {urls} urls but {destinations} destinations")]
    LengthMismatch { urls: usize, destinations: usize },

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("engine is shutting down")]
    ShuttingDown,
}

/// Failure to start an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engines spawn their dispatcher immediately and need a Tokio runtime.
    #[error("no Tokio runtime available")]
    NoRuntime,
}
