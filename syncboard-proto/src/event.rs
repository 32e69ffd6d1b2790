//! Board events broadcast on the shared task topic.
//!
//! Every mutation the store accepts produces exactly one [`BoardEvent`] on a
//! single logical topic. All three kinds carry the same payload shape: one
//! full [`Task`] snapshot. There is no diff format and no delete event;
//! clients infer removal from their own visibility predicate.
//!
//! Delivery is at-least-once and unordered. Receivers must merge
//! idempotently.

use serde::{Deserialize, Serialize};

use crate::task::{Task, ValidationError};

/// Which mutation produced an event.
///
/// The kind never changes how a payload is merged (every payload is a full
/// snapshot); it exists for logging and for tests that label scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A task was created.
    TaskCreated,
    /// A task's fields (title, description, status, assignees) were replaced.
    TaskUpdated,
    /// A task's status changed.
    TaskStatusChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TaskCreated => "task-created",
            Self::TaskUpdated => "task-updated",
            Self::TaskStatusChanged => "task-status-changed",
        };
        write!(f, "{s}")
    }
}

/// One broadcast notification: a kind tag plus the full task it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEvent {
    /// The mutation that produced this event.
    pub kind: EventKind,
    /// The complete task snapshot after that mutation.
    pub task: Task,
}

impl BoardEvent {
    /// Event for a freshly created task.
    #[must_use]
    pub const fn created(task: Task) -> Self {
        Self {
            kind: EventKind::TaskCreated,
            task,
        }
    }

    /// Event for a full field update.
    #[must_use]
    pub const fn updated(task: Task) -> Self {
        Self {
            kind: EventKind::TaskUpdated,
            task,
        }
    }

    /// Event for a status change.
    #[must_use]
    pub const fn status_changed(task: Task) -> Self {
        Self {
            kind: EventKind::TaskStatusChanged,
            task,
        }
    }

    /// Validates the payload at the receive boundary.
    ///
    /// # Errors
    ///
    /// Returns the payload's first [`ValidationError`]; an invalid payload
    /// must be dropped before it reaches any client state.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.task.validate()
    }
}
