//! Atomic engine counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::snapshot::TelemetrySnapshot;

/// Lock-free counters shared by the dispatcher and every worker.
#[derive(Debug)]
pub struct EngineMetrics {
    started_at: Instant,

    tasks_submitted: AtomicU64,
    tasks_started: AtomicU64,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_cancelled: AtomicU64,

    failed_attempts: AtomicU64,
    bytes_written: AtomicU64,
    bytes_cached: AtomicU64,

    active_workers: AtomicU64,
    peak_workers: AtomicU64,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            tasks_submitted: AtomicU64::new(0),
            tasks_started: AtomicU64::new(0),
            tasks_succeeded: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_cancelled: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            bytes_cached: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
            peak_workers: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Task lifecycle
    // =========================================================================

    pub fn tasks_submitted(&self, count: u64) {
        self.tasks_submitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a worker starting and updates the concurrency high-water mark.
    pub fn task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_workers.fetch_max(active, Ordering::SeqCst);
    }

    pub fn task_succeeded(&self) {
        self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a worker releasing its slot.
    pub fn task_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    pub fn attempt_failed(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn bytes_cached(&self, bytes: u64) {
        self.bytes_cached.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Workers currently holding a slot.
    pub fn active_workers(&self) -> u64 {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running workers observed.
    pub fn peak_workers(&self) -> u64 {
        self.peak_workers.load(Ordering::SeqCst)
    }

    /// Takes a point-in-time copy of all counters.
    ///
    /// Counters are read individually, so a snapshot taken while workers run
    /// may mix values from slightly different instants.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let elapsed = self.started_at.elapsed();
        let bytes_written = self.bytes_written.load(Ordering::Relaxed);
        let bytes_cached = self.bytes_cached.load(Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();

        TelemetrySnapshot {
            uptime_ms: elapsed.as_millis() as u64,
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            bytes_written,
            bytes_cached,
            active_workers: self.active_workers(),
            peak_workers: self.peak_workers(),
            bytes_per_second: if secs > 0.0 {
                (bytes_written + bytes_cached) as f64 / secs
            } else {
                0.0
            },
        }
    }
}
