//! Core task model shared by every Syncboard component.
//!
//! A [`Task`] is the unit of synchronization: the store returns full tasks,
//! the notification channel broadcasts full tasks, and clients merge full
//! tasks. There is no field-level diff format on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 255;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
///
/// Opaque to clients; assigned by the store on creation and stable for the
/// task's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (admin or employee).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new time-ordered user identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Workflow state of a task. Any state may move directly to any other;
/// the board does not enforce a linear progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Created, not started.
    Pending,
    /// Being worked on.
    InProgress,
    /// Finished; `completed_by` records who finished it.
    Completed,
}

impl TaskStatus {
    /// All statuses in board lane order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Parses the wire/lane name (`pending`, `in_progress`, `completed`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A resolved assignee reference: identity plus display name.
///
/// The store resolves raw [`UserId`]s to these before a task leaves it, so
/// clients never need a second lookup to render an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    /// The assignee's identity.
    pub id: UserId,
    /// Display name at resolution time.
    pub name: String,
}

/// A full task as held by the store and carried by every event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned stable identifier.
    pub id: TaskId,
    /// Non-empty title, at most [`MAX_TASK_TITLE_LENGTH`] characters.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Current workflow state.
    pub status: TaskStatus,
    /// Who completed the task. Present iff `status` is `Completed`; derived
    /// by the store, never set by an optimistic client patch.
    pub completed_by: Option<UserId>,
    /// Resolved assignees in server order. The server set is authoritative
    /// after every sync.
    pub assignees: Vec<Assignee>,
    /// Creation time; store reads are ordered most-recent-first by this.
    pub created_at: Timestamp,
}

/// Error returned when a task fails boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The title is empty.
    #[error("task title is empty")]
    TitleEmpty,
    /// The title exceeds the maximum allowed length.
    #[error("task title too long ({length} characters, max {max})")]
    TitleTooLong {
        /// Actual title length in characters.
        length: usize,
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// A completed task is missing its `completed_by` identity.
    #[error("completed task has no completed_by identity")]
    CompletedByMissing,
    /// `completed_by` is set although the task is not completed.
    #[error("completed_by set on a task with status {status}")]
    CompletedByNotCleared {
        /// The non-completed status the task carries.
        status: TaskStatus,
    },
}

impl Task {
    /// Validates a task at a trust boundary (decoded event payload or store
    /// response).
    ///
    /// Checks the title bounds and the `completed_by`/`status` pairing.
    /// Locally-held optimistic state is exempt from the pairing rule by
    /// construction: an optimistic patch never sets `completed_by`.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TASK_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong {
                length: title_chars,
                max: MAX_TASK_TITLE_LENGTH,
            });
        }
        match (self.status, &self.completed_by) {
            (TaskStatus::Completed, None) => Err(ValidationError::CompletedByMissing),
            (status, Some(_)) if status != TaskStatus::Completed => {
                Err(ValidationError::CompletedByNotCleared { status })
            }
            _ => Ok(()),
        }
    }

    /// Whether `user` is in this task's assignee set.
    #[must_use]
    pub fn is_assigned(&self, user: &UserId) -> bool {
        self.assignees.iter().any(|a| &a.id == user)
    }
}

/// Input for creating a task. The store assigns the id, the `Pending`
/// status, and the creation timestamp, and resolves the assignee ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Title for the new task.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Identities to assign; each must exist in the directory.
    pub assignees: Vec<UserId>,
}

/// Input for a full task update: every editable field at once, as submitted
/// by the edit form. `completed_by` is deliberately absent; the store
/// derives it from the resulting status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdit {
    /// Replacement title.
    pub title: String,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement status.
    pub status: TaskStatus,
    /// Replacement assignee identities.
    pub assignees: Vec<UserId>,
}
