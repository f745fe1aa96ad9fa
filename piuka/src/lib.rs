//! Piuka - a concurrent HTTP fetch engine.
//!
//! Submit batches of URLs with a destination each: a file path, or the
//! `::memory::` sentinel to keep the body in an in-memory cache. A fixed pool
//! of workers fetches them, splitting large files into ranged chunks and
//! retrying failed requests, and records one terminal status per task.
//!
//! # Example
//!
//! ```ignore
//! use piuka::{Engine, EngineConfig};
//!
//! let engine = Engine::start(EngineConfig::from_ini_file("piuka.ini")?)?;
//! let task = engine.add_one("https://example.com/data.bin", "/tmp/data.bin", None)?;
//! let status = engine.wait(task.id).await;
//! engine.shutdown().await;
//! ```

pub mod app;
pub mod cache;
pub mod download;
pub mod executor;
pub mod logging;
pub mod telemetry;
pub mod transport;

pub use app::{ConfigError, Engine, EngineConfig, EngineError, SubmitError};
pub use download::{AttemptError, FetchError, Phase};
pub use executor::{
    Destination, RetryPolicy, SubmittedTask, TaskId, TaskOutcome, TaskStatus, MEMORY_DESTINATION,
};
pub use telemetry::TelemetrySnapshot;
pub use transport::{HeaderSet, HttpRequest, HttpResponse, Transport, TransportError};
