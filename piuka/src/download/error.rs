//! Download error types.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// A request the worker retries as a unit.
///
/// Each phase has its own attempt counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// HEAD request discovering the resource length.
    Probe,
    /// One ranged GET.
    Chunk { index: u64, start: u64, end: u64 },
    /// Un-ranged GET (memory mode, or disk mode without a content length).
    Fetch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::Chunk { index, start, end } => write!(f, "chunk {} ({}-{})", index, start, end),
            Self::Fetch => write!(f, "fetch"),
        }
    }
}

/// Why a single attempt failed. Feeds the retry counter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server answered with status {status}")]
    HttpStatus { status: u16 },

    #[error("expected {expected} bytes, received {actual}")]
    BodyLength { expected: u64, actual: u64 },
}

/// Terminal failure of a task.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// A phase failed on every attempt.
    #[error("{phase} failed after {attempts} attempts: {last}")]
    RetryExhausted {
        phase: Phase,
        attempts: u32,
        last: AttemptError,
    },

    /// The destination could not be created or written.
    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The engine shut down while the task was running.
    #[error("cancelled by engine shutdown")]
    Cancelled,

    /// The worker panicked mid-task.
    #[error("worker panicked: {message}")]
    Panicked { message: String },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn panicked(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked { message }
    }

    /// Returns true if the failure came from engine shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
