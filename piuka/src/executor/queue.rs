//! FIFO queue of pending tasks.
//!
//! Submitters append whole batches under one lock acquisition; the
//! dispatcher pops from the front while holding the slot pool lock. Every
//! push wakes the dispatcher through a shared [`Notify`].

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::task::Task;

/// Pending tasks in submission order.
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    wakeup: Arc<Notify>,
}

impl TaskQueue {
    /// Creates a queue that signals `wakeup` on every push.
    pub fn new(wakeup: Arc<Notify>) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            wakeup,
        }
    }

    /// Appends tasks in order. Nothing is signalled for an empty batch.
    pub fn push_batch(&self, batch: impl IntoIterator<Item = Task>) -> usize {
        let pushed = {
            let mut tasks = self.tasks.lock();
            let before = tasks.len();
            tasks.extend(batch);
            tasks.len() - before
        };

        if pushed > 0 {
            self.wakeup.notify_one();
        }
        pushed
    }

    /// Removes the oldest task.
    pub fn pop(&self) -> Option<Task> {
        self.tasks.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
