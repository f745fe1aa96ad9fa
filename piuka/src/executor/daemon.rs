//! Dispatcher daemon binding queued tasks to worker slots.
//!
//! The [`Dispatcher`] is a long-running background service that:
//! - Wakes when tasks are enqueued or a slot is released
//! - Falls back to a fixed tick so a missed wakeup costs at most one interval
//! - Binds queued tasks to idle slots in FIFO order
//! - Spawns one worker per binding on the engine's task tracker
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Dispatcher                            │
//! │                                                                │
//! │  enqueue ──┐                                                   │
//! │  release ──┼──► wakeup ──► ┌──────────────┐                    │
//! │  tick ─────┘               │ SlotPool     │──► Assignment ──┐  │
//! │                            │  ::assign()  │                 │  │
//! │                            └──────────────┘                 │  │
//! │                                                             ▼  │
//! │                                               tracker.spawn(   │
//! │                                                 Worker::run)   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dispatcher never performs network I/O.
//!
//! # Example
//!
//! ```ignore
//! use piuka::executor::Dispatcher;
//!
//! let dispatcher = Dispatcher::new(queue, pool, wakeup, worker_ctx, tracker.clone(), interval);
//! tracker.spawn(dispatcher.run(shutdown.clone()));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use super::pool::SlotPool;
use super::queue::TaskQueue;
use crate::download::{Worker, WorkerContext};

/// Default fallback tick of the dispatch loop.
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Assigns queued tasks to idle slots and spawns their workers.
pub struct Dispatcher {
    queue: Arc<TaskQueue>,
    pool: Arc<SlotPool>,
    wakeup: Arc<Notify>,
    worker_ctx: Arc<WorkerContext>,
    tracker: TaskTracker,
    interval: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Arguments
    ///
    /// * `queue` - Pending tasks
    /// * `pool` - Slot pool limiting concurrency
    /// * `wakeup` - Signalled by the queue on push and by the pool on release
    /// * `worker_ctx` - Shared state handed to each worker
    /// * `tracker` - Tracker that owns spawned workers
    /// * `interval` - Fallback tick
    pub fn new(
        queue: Arc<TaskQueue>,
        pool: Arc<SlotPool>,
        wakeup: Arc<Notify>,
        worker_ctx: Arc<WorkerContext>,
        tracker: TaskTracker,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            pool,
            wakeup,
            worker_ctx,
            tracker,
            interval,
        }
    }

    /// Runs the dispatch loop until shutdown is signalled.
    ///
    /// Tasks still queued at shutdown are left in the queue.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            slots = self.pool.capacity(),
            interval_ms = self.interval.as_millis() as u64,
            "Dispatcher starting"
        );

        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(queued = self.queue.len(), "Dispatcher shutting down");
                    break;
                }

                _ = self.wakeup.notified() => {
                    trace!("Dispatcher woken");
                }

                _ = tick.tick() => {}
            }

            // Re-check so nothing is spawned once shutdown has begun
            if shutdown.is_cancelled() {
                continue;
            }
            self.dispatch_ready();
        }

        info!("Dispatcher stopped");
    }

    /// Binds as many queued tasks as there are idle slots.
    ///
    /// Returns the number of workers spawned.
    pub fn dispatch_ready(&self) -> usize {
        let assignments = self.pool.assign(&self.queue);
        let spawned = assignments.len();

        for assignment in assignments {
            debug!(
                task_id = %assignment.task.id,
                slot = assignment.guard.index(),
                url = %assignment.task.url,
                "Dispatching task"
            );
            let worker = Worker::new(
                assignment.task,
                assignment.guard,
                Arc::clone(&self.worker_ctx),
            );
            self.tracker.spawn(worker.run());
        }

        spawned
    }
}
