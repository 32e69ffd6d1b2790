//! Drag-and-drop resolution.
//!
//! A finished drag reports only what the card was released over: a lane
//! surface or another card. [`resolve_drop`] turns that into the status
//! change the gesture implies, or `None` when nothing should happen.

use syncboard_proto::task::{Task, TaskId, TaskStatus};
use uuid::Uuid;

/// The surface a dragged card was released over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A lane background, named by the lane's status.
    Lane(TaskStatus),
    /// Another card, identified by its task id.
    Card(TaskId),
}

impl DropTarget {
    /// Parses a drop surface identifier as reported by the view layer:
    /// lane surfaces carry their status name, cards carry their task id.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(status) = TaskStatus::from_name(raw) {
            return Some(Self::Lane(status));
        }
        Uuid::parse_str(raw)
            .ok()
            .map(|uuid| Self::Card(TaskId::from_uuid(uuid)))
    }
}

/// The status move a drag resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// The dragged task.
    pub task_id: TaskId,
    /// The lane it should move to.
    pub to: TaskStatus,
}

/// Resolves a finished drag against the current view.
///
/// Dropping on a card adopts that card's lane. Returns `None` for moves
/// within the same lane (including a card dropped on itself) and when
/// either the dragged task or a card target is no longer in the view,
/// which can happen whenever an event lands mid-drag.
#[must_use]
pub fn resolve_drop(tasks: &[Task], dragged: &TaskId, target: &DropTarget) -> Option<StatusChange> {
    let current = tasks.iter().find(|task| &task.id == dragged)?;
    let to = match target {
        DropTarget::Lane(status) => *status,
        DropTarget::Card(other) => tasks.iter().find(|task| &task.id == other)?.status,
    };
    if to == current.status {
        return None;
    }
    Some(StatusChange {
        task_id: dragged.clone(),
        to,
    })
}
