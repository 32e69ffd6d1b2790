//! Task persistence behind the sessions.
//!
//! Defines the [`TaskStore`] trait clients issue their requests against.
//! The concrete implementation is [`memory::InMemoryTaskStore`] — the
//! canonical in-process task list, which enforces the write rules and
//! publishes one full-task event per accepted write.

pub mod memory;

pub use memory::InMemoryTaskStore;

use syncboard_proto::task::{Task, TaskDraft, TaskEdit, TaskId, TaskStatus, UserId, ValidationError};
use thiserror::Error;

use crate::directory::Session;

/// Errors that can occur during store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The session's role does not permit the operation.
    #[error("only admins may {0}")]
    Forbidden(&'static str),

    /// An assignee id does not name a directory user.
    #[error("unknown assignee: {0}")]
    UnknownAssignee(UserId),

    /// The write would produce an invalid task.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Async store trait for reading and mutating the canonical task list.
///
/// Writes are atomic per task: either the full candidate is accepted,
/// stored, and announced as an event, or nothing changes. `completed_by`
/// is derived here from the acting session and the resulting status —
/// callers cannot set it.
pub trait TaskStore: Send + Sync {
    /// Fetch every task, newest first.
    ///
    /// Returns the full list regardless of the session's role; each
    /// client applies its own visibility predicate to the result.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Create a task from a draft. Admin only.
    ///
    /// New tasks start in `Pending` with no completer. Assignee ids are
    /// resolved to directory profiles before anything is written.
    fn create(
        &self,
        session: &Session,
        draft: TaskDraft,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Replace a task's editable fields. Admin only.
    fn update(
        &self,
        session: &Session,
        id: &TaskId,
        edit: TaskEdit,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Move a task to a status. Open to every role.
    fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: TaskStatus,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;
}
