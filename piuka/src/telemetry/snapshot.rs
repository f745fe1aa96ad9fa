use serde::Serialize;

/// Point-in-time copy of [`EngineMetrics`](super::EngineMetrics).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Time since the engine started.
    pub uptime_ms: u64,

    pub tasks_submitted: u64,
    pub tasks_started: u64,
    pub tasks_succeeded: u64,
    /// Failed for any reason other than shutdown.
    pub tasks_failed: u64,
    pub tasks_cancelled: u64,

    /// Attempts that failed and were retried or exhausted a phase.
    pub failed_attempts: u64,
    pub bytes_written: u64,
    pub bytes_cached: u64,

    pub active_workers: u64,
    pub peak_workers: u64,

    /// Average throughput since start, disk and memory combined.
    pub bytes_per_second: f64,
}

impl TelemetrySnapshot {
    /// Tasks submitted that have no outcome yet.
    pub fn pending(&self) -> u64 {
        self.tasks_submitted.saturating_sub(
            self.tasks_succeeded + self.tasks_failed + self.tasks_cancelled,
        )
    }

    /// Tasks with a terminal outcome.
    pub fn finished(&self) -> u64 {
        self.tasks_succeeded + self.tasks_failed + self.tasks_cancelled
    }
}
