//! The engine facade.
//!
//! An [`Engine`] owns the queue, the slot pool, the dispatcher, the status
//! store and the memory cache. Submissions return immediately; work happens
//! on background tasks until [`Engine::shutdown`] or drop.
//!
//! # Example
//!
//! ```ignore
//! use piuka::{Engine, EngineConfig, TaskStatus};
//!
//! let engine = Engine::start(EngineConfig::default().with_workers(4))?;
//!
//! let tasks = engine.add(
//!     &["https://example.com/a.iso", "https://example.com/b.json"],
//!     &["/data/a.iso", "::memory::"],
//!     None,
//! )?;
//!
//! for task in &tasks {
//!     if let TaskStatus::Failed(err) = engine.wait(task.id).await {
//!         eprintln!("{} failed: {}", task.url, err);
//!     }
//! }
//! let json = engine.cached("https://example.com/b.json");
//!
//! engine.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::config::EngineConfig;
use super::error::{EngineError, SubmitError};
use crate::cache::MemoryCache;
use crate::download::WorkerContext;
use crate::executor::{
    Destination, Dispatcher, SlotPool, StatusStore, SubmittedTask, Task, TaskId, TaskQueue,
    TaskStatus,
};
use crate::telemetry::{EngineMetrics, TelemetrySnapshot};
use crate::transport::{ReqwestTransport, Transport};

/// Concurrent HTTP fetch engine.
pub struct Engine {
    config: EngineConfig,
    queue: Arc<TaskQueue>,
    pool: Arc<SlotPool>,
    status: Arc<StatusStore>,
    cache: Arc<MemoryCache>,
    metrics: Arc<EngineMetrics>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Engine {
    /// Starts an engine using the reqwest transport.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.proxies)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Starts an engine on a caller-supplied transport.
    pub fn with_transport(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let wakeup = Arc::new(Notify::new());
        let queue = Arc::new(TaskQueue::new(Arc::clone(&wakeup)));
        let pool = Arc::new(SlotPool::new(config.workers, Arc::clone(&wakeup)));
        let status = Arc::new(StatusStore::new());
        let cache = Arc::new(MemoryCache::new());
        let metrics = Arc::new(EngineMetrics::new());
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        let worker_ctx = Arc::new(WorkerContext {
            transport,
            headers: config.effective_headers(),
            retry: config.retry.clone(),
            flush_threshold: config.flush_threshold,
            status: Arc::clone(&status),
            cache: Arc::clone(&cache),
            metrics: Arc::clone(&metrics),
            shutdown: shutdown.clone(),
        });

        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&pool),
            wakeup,
            worker_ctx,
            tracker.clone(),
            config.dispatch_interval,
        );
        tracker.spawn(dispatcher.run(shutdown.clone()));

        info!(
            workers = config.workers,
            timeout_ms = config.timeout.as_millis() as u64,
            flush_threshold = config.flush_threshold,
            max_attempts = config.retry.max_attempts(),
            "Engine started"
        );

        Ok(Self {
            config,
            queue,
            pool,
            status,
            cache,
            metrics,
            shutdown,
            tracker,
        })
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits a batch of fetches.
    ///
    /// `urls[i]` is fetched into `destinations[i]`; the `::memory::`
    /// destination stores the body in the memory cache instead of a file.
    /// `timeout_secs` overrides the configured per-request timeout for the
    /// whole batch.
    ///
    /// The batch is validated as a whole before anything is queued, and is
    /// queued in input order. Performs no network I/O.
    pub fn add<U, D>(
        &self,
        urls: &[U],
        destinations: &[D],
        timeout_secs: Option<u64>,
    ) -> Result<Vec<SubmittedTask>, SubmitError>
    where
        U: AsRef<str>,
        D: Clone + Into<Destination>,
    {
        if urls.len() != destinations.len() {
            return Err(SubmitError::LengthMismatch {
                urls: urls.len(),
                destinations: destinations.len(),
            });
        }

        let pairs = urls
            .iter()
            .map(|url| url.as_ref())
            .zip(destinations.iter().map(|d| -> Destination { d.clone().into() }));
        self.enqueue(pairs, timeout_secs)
    }

    /// Submits a single fetch.
    pub fn add_one(
        &self,
        url: &str,
        destination: impl Into<Destination>,
        timeout_secs: Option<u64>,
    ) -> Result<SubmittedTask, SubmitError> {
        let mut submitted = self.enqueue([(url, destination.into())], timeout_secs)?;
        submitted.pop().ok_or(SubmitError::ShuttingDown)
    }

    fn enqueue<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, Destination)>,
        timeout_secs: Option<u64>,
    ) -> Result<Vec<SubmittedTask>, SubmitError> {
        if self.shutdown.is_cancelled() {
            return Err(SubmitError::ShuttingDown);
        }

        let timeout = match timeout_secs {
            Some(0) => return Err(SubmitError::InvalidTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => self.config.timeout,
        };

        let tasks = pairs
            .into_iter()
            .map(|(url, destination)| {
                Url::parse(url).map_err(|e| SubmitError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Task::new(url, destination, timeout))
            })
            .collect::<Result<Vec<_>, SubmitError>>()?;

        let submitted: Vec<_> = tasks.iter().map(Task::receipt).collect();
        self.metrics.tasks_submitted(tasks.len() as u64);
        let queued = self.queue.push_batch(tasks);

        debug!(
            count = queued,
            timeout_ms = timeout.as_millis() as u64,
            "Tasks queued"
        );
        Ok(submitted)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current status of a task. Unknown identifiers report `Pending`.
    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.status.get(id)
    }

    /// Waits for a task to reach a terminal status.
    ///
    /// If the engine shuts down first, waits for in-flight workers to settle
    /// and returns whatever status the task has then, which is `Pending` for
    /// tasks that never left the queue.
    pub async fn wait(&self, id: TaskId) -> TaskStatus {
        tokio::select! {
            biased;
            outcome = self.status.wait(id) => outcome.into(),
            _ = self.shutdown.cancelled() => {
                self.tracker.close();
                self.tracker.wait().await;
                self.status(id)
            }
        }
    }

    /// Body fetched in memory mode for `url`, if any.
    pub fn cached(&self, url: &str) -> Option<Bytes> {
        self.cache.get(url)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Slots currently bound to a task.
    pub fn running(&self) -> usize {
        self.pool.busy_count()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops dispatching, cancels in-flight tasks and waits for every worker.
    ///
    /// In-flight tasks record `Failed(Cancelled)`. Queued tasks stay pending.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        info!(
            queued = self.queued(),
            running = self.running(),
            "Engine shutting down"
        );
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let snapshot = self.telemetry();
        info!(
            succeeded = snapshot.tasks_succeeded,
            failed = snapshot.tasks_failed,
            cancelled = snapshot.tasks_cancelled,
            "Engine stopped"
        );
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("workers", &self.config.workers)
            .field("queued", &self.queued())
            .field("running", &self.running())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ConfigError;
    use crate::download::FetchError;
    use crate::executor::RetryPolicy;
    use crate::transport::tests::MockTransport;
    use std::path::PathBuf;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_workers(2)
            .with_retry(RetryPolicy::immediate(10))
            .with_dispatch_interval(Duration::from_millis(10))
    }

    fn engine(mock: Arc<MockTransport>) -> Engine {
        Engine::with_transport(config(), mock).unwrap()
    }

    #[test]
    fn test_requires_runtime() {
        let mock = Arc::new(MockTransport::serving(Vec::<u8>::new()));
        let err = Engine::with_transport(config(), mock).unwrap_err();
        assert!(matches!(err, EngineError::NoRuntime));
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mock = Arc::new(MockTransport::serving(Vec::<u8>::new()));
        let err = Engine::with_transport(config().with_workers(0), mock).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::InvalidWorkers)));
    }

    #[tokio::test]
    async fn test_add_returns_tasks_in_order() {
        let mock = Arc::new(MockTransport::serving(&b"abc"[..]));
        let engine = engine(mock);

        let tasks = engine
            .add(
                &["http://example.com/1", "http://example.com/2"],
                &["::memory::", "::memory::"],
                Some(5),
            )
            .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].url, "http://example.com/1");
        assert_eq!(tasks[1].url, "http://example.com/2");
        assert_ne!(tasks[0].id, tasks[1].id);
        assert!(tasks[0].destination.is_memory());

        for task in &tasks {
            assert_eq!(engine.wait(task.id).await, TaskStatus::Succeeded);
        }
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_validates_before_enqueue() {
        let mock = Arc::new(MockTransport::serving(Vec::<u8>::new()));
        let engine = engine(mock.clone());

        assert_eq!(
            engine.add(&["http://a/1", "http://a/2"], &["::memory::"], None),
            Err(SubmitError::LengthMismatch {
                urls: 2,
                destinations: 1
            })
        );
        assert_eq!(
            engine.add(&["http://a/1"], &["::memory::"], Some(0)),
            Err(SubmitError::InvalidTimeout)
        );
        assert!(matches!(
            engine.add(&["http://a/1", "not a url"], &["::memory::", "::memory::"], None),
            Err(SubmitError::InvalidUrl { .. })
        ));

        assert_eq!(engine.queued(), 0);
        assert_eq!(engine.telemetry().tasks_submitted, 0);
        engine.shutdown().await;
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = engine(Arc::new(MockTransport::serving(Vec::<u8>::new())));
        let tasks = engine.add::<&str, &str>(&[], &[], None).unwrap();
        assert!(tasks.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_timeout_override_reaches_transport() {
        let mock = Arc::new(MockTransport::serving(&b"x"[..]));
        let engine = engine(mock.clone());

        let task = engine
            .add_one("http://example.com/t", Destination::Memory, Some(7))
            .unwrap();
        engine.wait(task.id).await;

        assert_eq!(mock.requests.lock()[0].timeout, Duration::from_secs(7));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_one_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("one.bin");
        let mock = Arc::new(MockTransport::serving(&b"file body"[..]));
        let engine = engine(mock);

        let task = engine
            .add_one("http://example.com/f", path.clone(), None)
            .unwrap();

        assert_eq!(engine.wait(task.id).await, TaskStatus::Succeeded);
        assert_eq!(std::fs::read(&path).unwrap(), b"file body");
        assert_eq!(engine.cached("http://example.com/f"), None);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let engine = engine(Arc::new(MockTransport::serving(Vec::<u8>::new())));
        engine.shutdown().await;

        assert_eq!(
            engine.add_one("http://example.com/late", Destination::Memory, None),
            Err(SubmitError::ShuttingDown)
        );
        assert!(engine.is_shutting_down());
    }

    #[tokio::test]
    async fn test_failed_task_reports_error() {
        let mock = Arc::new(MockTransport::serving(Vec::<u8>::new()).with_status(404));
        let engine = engine(mock);

        let task = engine
            .add_one("http://example.com/missing", Destination::Memory, None)
            .unwrap();

        match engine.wait(task.id).await {
            TaskStatus::Failed(FetchError::RetryExhausted { attempts, .. }) => {
                assert_eq!(attempts, 10)
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(engine.telemetry().tasks_failed, 1);
        engine.shutdown().await;
    }
}
