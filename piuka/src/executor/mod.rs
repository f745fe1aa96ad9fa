//! Task scheduling: queue, slot pool, dispatcher and outcome store.
//!
//! # Architecture
//!
//! ```text
//! Engine::add ──► TaskQueue ──► Dispatcher ──► SlotPool (N slots) ──► Worker
//!                  (FIFO)        (tick +          (Idle / Busy)          │
//!                                 wakeup)                                ▼
//!                                                                  StatusStore
//! ```
//!
//! The queue and pool share one [`Notify`](tokio::sync::Notify): pushing a
//! batch or releasing a slot wakes the dispatcher immediately.

mod daemon;
mod policy;
mod pool;
mod queue;
mod status;
mod task;

pub use daemon::{Dispatcher, DEFAULT_DISPATCH_INTERVAL};
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
pub use pool::{Assignment, SlotGuard, SlotPool, SlotState};
pub use queue::TaskQueue;
pub use status::{StatusStore, TaskOutcome, TaskStatus};
pub use task::{Destination, SubmittedTask, Task, TaskId, MEMORY_DESTINATION};
