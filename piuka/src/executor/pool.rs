//! Fixed-size worker slot pool.
//!
//! The pool owns `N` slots, each idle or bound to one task. Binding happens in
//! [`SlotPool::assign`], which holds the pool lock while popping from the
//! queue, so a task is never bound to two slots and no slot takes two tasks.
//!
//! ```text
//!   TaskQueue ──pop──▶ ┌────────┬────────┬────────┐
//!                      │ slot 0 │ slot 1 │ slot 2 │   Busy(task) / Idle
//!                      └───┬────┴────────┴────────┘
//!                          │ SlotGuard dropped by the worker
//!                          ▼
//!                        Idle + wake dispatcher
//! ```
//!
//! Lock order is pool then queue. Submitters only take the queue lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::queue::TaskQueue;
use super::task::{Task, TaskId};

/// State of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Busy(TaskId),
}

/// A task bound to a slot, ready to hand to a worker.
pub struct Assignment {
    pub task: Task,
    pub guard: SlotGuard,
}

/// Bounded set of worker slots.
pub struct SlotPool {
    slots: Mutex<Vec<SlotState>>,
    wakeup: Arc<Notify>,
}

impl SlotPool {
    /// Creates a pool of `capacity` idle slots that signals `wakeup` whenever
    /// a slot is released.
    pub fn new(capacity: usize, wakeup: Arc<Notify>) -> Self {
        Self {
            slots: Mutex::new(vec![SlotState::Idle; capacity]),
            wakeup,
        }
    }

    /// Binds queued tasks to idle slots, lowest slot index first.
    ///
    /// Returns one assignment per bound task. Each assignment's guard frees
    /// its slot when dropped.
    pub fn assign(self: &Arc<Self>, queue: &TaskQueue) -> Vec<Assignment> {
        let mut slots = self.slots.lock();
        let mut assignments = Vec::new();

        for (index, state) in slots.iter_mut().enumerate() {
            if *state != SlotState::Idle {
                continue;
            }
            let Some(task) = queue.pop() else {
                break;
            };
            *state = SlotState::Busy(task.id);
            assignments.push(Assignment {
                task,
                guard: SlotGuard {
                    pool: Arc::clone(self),
                    index,
                },
            });
        }

        assignments
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn busy_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| matches!(s, SlotState::Busy(_)))
            .count()
    }

    pub fn idle_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| matches!(s, SlotState::Idle))
            .count()
    }

    /// Snapshot of every slot.
    pub fn states(&self) -> Vec<SlotState> {
        self.slots.lock().clone()
    }

    fn release(&self, index: usize) {
        if let Some(state) = self.slots.lock().get_mut(index) {
            *state = SlotState::Idle;
        }
        self.wakeup.notify_one();
    }
}

/// Frees its slot on drop, including when the worker panics.
pub struct SlotGuard {
    pool: Arc<SlotPool>,
    index: usize,
}

impl SlotGuard {
    /// Index of the held slot.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard").field("index", &self.index).finish()
    }
}
