//! Write-once task outcome store.
//!
//! Workers record exactly one [`TaskOutcome`] per task. A task with no entry
//! is pending (queued or running). Waiters are woken on every write.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Notify;

use super::task::TaskId;
use crate::download::FetchError;

/// Terminal result of a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(FetchError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Status reported to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued or running. Also returned for identifiers the engine never issued.
    Pending,
    Succeeded,
    Failed(FetchError),
}

impl TaskStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

impl From<TaskOutcome> for TaskStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Succeeded => Self::Succeeded,
            TaskOutcome::Failed(err) => Self::Failed(err),
        }
    }
}

/// Concurrent map of finished tasks.
#[derive(Default)]
pub struct StatusStore {
    outcomes: DashMap<TaskId, TaskOutcome>,
    changed: Arc<Notify>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a task.
    ///
    /// Returns false, leaving the existing entry untouched, if the task
    /// already has an outcome.
    pub fn record(&self, id: TaskId, outcome: TaskOutcome) -> bool {
        let inserted = match self.outcomes.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                true
            }
        };

        if inserted {
            self.changed.notify_waiters();
        }
        inserted
    }

    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.outcomes.get(&id).map(|entry| entry.value().clone())
    }

    pub fn get(&self, id: TaskId) -> TaskStatus {
        self.outcome(id)
            .map(TaskStatus::from)
            .unwrap_or(TaskStatus::Pending)
    }

    /// Waits until the task has an outcome.
    pub async fn wait(&self, id: TaskId) -> TaskOutcome {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a write between the check and the
            // await is not missed
            notified.as_mut().enable();

            if let Some(outcome) = self.outcome(id) {
                return outcome;
            }
            notified.await;
        }
    }

    /// Number of finished tasks.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
