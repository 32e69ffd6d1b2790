//! Client-side state reconciliation for the shared board.
//!
//! Each session owns a [`SyncEngine`] that merges three inflows into one
//! local task set: snapshot loads, optimistic local patches, and full-task
//! events from the shared topic. Merging is last-writer-wins per whole
//! task, filtered through the session's [`Viewer`] predicate.

pub mod engine;
pub mod visibility;

pub use engine::{FieldPatch, MergeOutcome, Provenance, SyncEngine, TaskPatch, TaskSnapshot};
pub use visibility::Viewer;

use syncboard_proto::task::{TaskId, ValidationError};
use thiserror::Error;

/// Errors that can occur while mutating the local task set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The patched task is not in the local set.
    #[error("task not in local set: {0}")]
    UnknownTask(TaskId),
    /// The patch would produce an invalid task.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
