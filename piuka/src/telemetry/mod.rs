//! Engine telemetry for observability.
//!
//! Workers and the dispatcher update lock-free atomic counters in
//! [`EngineMetrics`]; callers read a consistent-enough point-in-time copy as a
//! [`TelemetrySnapshot`].
//!
//! # Architecture
//!
//! ```text
//! Dispatcher / Workers ─────► EngineMetrics ─────► TelemetrySnapshot ─────► Views
//!                             (atomic counters)    (point-in-time copy)      (logs, JSON)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use piuka::telemetry::EngineMetrics;
//!
//! let metrics = EngineMetrics::new();
//! metrics.tasks_submitted(3);
//! metrics.task_started();
//! metrics.bytes_written(4096);
//! metrics.task_succeeded();
//!
//! let snapshot = metrics.snapshot();
//! println!("Succeeded: {}", snapshot.tasks_succeeded);
//! ```

mod metrics;
mod snapshot;

pub use metrics::EngineMetrics;
pub use snapshot::TelemetrySnapshot;
