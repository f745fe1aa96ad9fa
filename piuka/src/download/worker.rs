//! Per-task download protocol.
//!
//! A [`Worker`] owns one task and the slot it was bound to. It runs the task
//! to a terminal outcome, records that outcome, and frees the slot last.
//!
//! # Disk mode
//!
//! ```text
//! create file ──► HEAD probe ──► ChunkPlan ──► ranged GET per chunk ──► flush
//!                    │                            (append in order)
//!                    └─ no content-length ──► single GET ──► write ──► flush
//! ```
//!
//! # Memory mode
//!
//! A single un-ranged GET whose body is stored in the [`MemoryCache`] under
//! the task URL. No file is touched.
//!
//! Every request runs under [`retry_phase`] with its own attempt counter.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::chunk::{ByteRange, ChunkPlan};
use super::error::{AttemptError, FetchError, Phase};
use super::retry::retry_phase;
use crate::cache::MemoryCache;
use crate::executor::{Destination, RetryPolicy, SlotGuard, StatusStore, Task, TaskOutcome};
use crate::telemetry::EngineMetrics;
use crate::transport::{HeaderSet, HttpRequest, HttpResponse, Transport};

/// Everything a worker shares with the engine.
pub struct WorkerContext {
    pub transport: Arc<dyn Transport>,
    /// Configured headers, already normalized and carrying a user agent.
    pub headers: HeaderSet,
    pub retry: RetryPolicy,
    pub flush_threshold: u64,
    pub status: Arc<StatusStore>,
    pub cache: Arc<MemoryCache>,
    pub metrics: Arc<EngineMetrics>,
    pub shutdown: CancellationToken,
}

/// One task bound to one slot.
pub struct Worker {
    task: Task,
    slot: SlotGuard,
    ctx: Arc<WorkerContext>,
}

impl Worker {
    pub fn new(task: Task, slot: SlotGuard, ctx: Arc<WorkerContext>) -> Self {
        Self { task, slot, ctx }
    }

    /// Runs the task to completion.
    ///
    /// Always records exactly one outcome, including when the fetch panics.
    /// The slot is released when this future completes, after the outcome
    /// is visible.
    pub async fn run(self) {
        let Self { task, slot, ctx } = self;
        let span = info_span!("worker", task_id = %task.id, slot = slot.index());

        async {
            let _active = ActiveWorker::enter(&ctx.metrics);
            debug!(url = %task.url, destination = %task.destination, "Task started");

            let fetch = async {
                match &task.destination {
                    Destination::File(path) => fetch_to_file(&ctx, &task, path).await,
                    Destination::Memory => fetch_to_memory(&ctx, &task).await,
                }
            };
            let result = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(FetchError::panicked(payload.as_ref())));

            let outcome = match result {
                Ok(()) => {
                    ctx.metrics.task_succeeded();
                    info!(url = %task.url, "Task succeeded");
                    TaskOutcome::Succeeded
                }
                Err(FetchError::Cancelled) => {
                    ctx.metrics.task_cancelled();
                    info!(url = %task.url, "Task cancelled by shutdown");
                    TaskOutcome::Failed(FetchError::Cancelled)
                }
                Err(err @ FetchError::Panicked { .. }) => {
                    ctx.metrics.task_failed();
                    error!(url = %task.url, error = %err, "Worker panicked");
                    TaskOutcome::Failed(err)
                }
                Err(err) => {
                    ctx.metrics.task_failed();
                    warn!(url = %task.url, error = %err, "Task failed");
                    TaskOutcome::Failed(err)
                }
            };

            ctx.status.record(task.id, outcome);
        }
        .instrument(span)
        .await;

        drop(slot);
    }
}

/// Counts a worker as active until dropped, even on unwind.
struct ActiveWorker<'a> {
    metrics: &'a EngineMetrics,
}

impl<'a> ActiveWorker<'a> {
    fn enter(metrics: &'a EngineMetrics) -> Self {
        metrics.task_started();
        Self { metrics }
    }
}

impl Drop for ActiveWorker<'_> {
    fn drop(&mut self) {
        self.metrics.task_finished();
    }
}

// =============================================================================
// Disk mode
// =============================================================================

async fn fetch_to_file(ctx: &WorkerContext, task: &Task, path: &Path) -> Result<(), FetchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::io(parent, e))?;
    }
    let mut file = File::create(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;

    let transport = ctx.transport.as_ref();
    let request = HttpRequest::new(task.url.as_str(), ctx.headers.clone(), task.timeout);
    let probe_request = &request;

    let probe = retry_phase(
        &ctx.retry,
        &ctx.shutdown,
        &ctx.metrics,
        Phase::Probe,
        move || send_head(transport, probe_request),
    )
    .await?;

    let Some(total_length) = probe.content_length() else {
        debug!("Probe carried no content-length, fetching whole body");
        let body = retry_phase(
            &ctx.retry,
            &ctx.shutdown,
            &ctx.metrics,
            Phase::Fetch,
            move || send_get(transport, probe_request),
        )
        .await?;
        write_chunk(ctx, &mut file, path, &body).await?;
        return file.flush().await.map_err(|e| FetchError::io(path, e));
    };

    let plan = ChunkPlan::new(total_length, ctx.flush_threshold);
    debug!(
        total_length,
        chunks = plan.chunk_count(),
        chunk_size = plan.chunk_size(),
        "Planned download"
    );

    for (range, index) in plan.iter().zip(0u64..) {
        let ranged = request.with_range(range);
        let ranged = &ranged;
        let phase = Phase::Chunk {
            index,
            start: range.start,
            end: range.end,
        };

        let body = retry_phase(
            &ctx.retry,
            &ctx.shutdown,
            &ctx.metrics,
            phase,
            move || send_range(transport, ranged, range),
        )
        .await?;
        write_chunk(ctx, &mut file, path, &body).await?;
    }

    file.flush().await.map_err(|e| FetchError::io(path, e))
}

async fn write_chunk(
    ctx: &WorkerContext,
    file: &mut File,
    path: &Path,
    body: &Bytes,
) -> Result<(), FetchError> {
    file.write_all(body)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    ctx.metrics.bytes_written(body.len() as u64);
    Ok(())
}

// =============================================================================
// Memory mode
// =============================================================================

async fn fetch_to_memory(ctx: &WorkerContext, task: &Task) -> Result<(), FetchError> {
    let transport = ctx.transport.as_ref();
    let request = HttpRequest::new(task.url.as_str(), ctx.headers.clone(), task.timeout);
    let request = &request;

    let body = retry_phase(
        &ctx.retry,
        &ctx.shutdown,
        &ctx.metrics,
        Phase::Fetch,
        move || send_get(transport, request),
    )
    .await?;

    ctx.metrics.bytes_cached(body.len() as u64);
    ctx.cache.insert(task.url.as_str(), body);
    Ok(())
}

// =============================================================================
// Single attempts
// =============================================================================

async fn send_head(
    transport: &dyn Transport,
    request: &HttpRequest,
) -> Result<HttpResponse, AttemptError> {
    let response = transport.head(request).await?;
    ensure_success(&response)?;
    Ok(response)
}

async fn send_get(transport: &dyn Transport, request: &HttpRequest) -> Result<Bytes, AttemptError> {
    let response = transport.get(request).await?;
    ensure_success(&response)?;
    Ok(response.body)
}

async fn send_range(
    transport: &dyn Transport,
    request: &HttpRequest,
    range: ByteRange,
) -> Result<Bytes, AttemptError> {
    let body = send_get(transport, request).await?;
    let actual = body.len() as u64;
    if actual != range.len() {
        return Err(AttemptError::BodyLength {
            expected: range.len(),
            actual,
        });
    }
    Ok(body)
}

fn ensure_success(response: &HttpResponse) -> Result<(), AttemptError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(AttemptError::HttpStatus {
            status: response.status,
        })
    }
}
