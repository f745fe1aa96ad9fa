//! Task identity and description.
//!
//! A [`Task`] is immutable once created. Its [`TaskId`] comes from a global
//! monotonic counter, so identifiers stay unique across engines and under
//! concurrent submission.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Destination string that routes a fetch into the memory cache.
pub const MEMORY_DESTINATION: &str = "::memory::";

// =============================================================================
// Task Identifier
// =============================================================================

/// Global counter backing [`TaskId::next`].
static TASK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates a fresh identifier.
    pub fn next() -> Self {
        Self(TASK_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

// =============================================================================
// Destination
// =============================================================================

/// Where a fetched body ends up.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Written to this path, created or truncated.
    File(PathBuf),
    /// Stored in the engine's memory cache under the task URL.
    Memory,
}

impl Destination {
    /// Parses a destination string. Only the exact [`MEMORY_DESTINATION`]
    /// sentinel selects memory mode.
    pub fn parse(destination: &str) -> Self {
        if destination == MEMORY_DESTINATION {
            Self::Memory
        } else {
            Self::File(PathBuf::from(destination))
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Returns the file path for disk destinations.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Memory => None,
        }
    }
}

impl From<&str> for Destination {
    fn from(destination: &str) -> Self {
        Self::parse(destination)
    }
}

impl From<String> for Destination {
    fn from(destination: String) -> Self {
        Self::parse(&destination)
    }
}

impl From<&Path> for Destination {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<PathBuf> for Destination {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(MEMORY_DESTINATION),
        }
    }
}

// =============================================================================
// Task
// =============================================================================

/// One fetch waiting in the queue or running on a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub destination: Destination,
    /// Per-request timeout: the submission override or the engine default.
    pub timeout: Duration,
}

impl Task {
    /// Creates a task with a freshly allocated identifier.
    pub fn new(url: impl Into<String>, destination: Destination, timeout: Duration) -> Self {
        Self {
            id: TaskId::next(),
            url: url.into(),
            destination,
            timeout,
        }
    }

    /// Receipt handed back to the submitter.
    pub fn receipt(&self) -> SubmittedTask {
        SubmittedTask {
            url: self.url.clone(),
            destination: self.destination.clone(),
            id: self.id,
        }
    }
}

/// Returned by submission for every accepted task, in input order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTask {
    pub url: String,
    pub destination: Destination,
    pub id: TaskId,
}
