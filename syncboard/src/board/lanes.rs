//! Lane projection of the reconciled task set.

use syncboard_proto::task::{Task, TaskStatus};

/// The lane a task renders in.
///
/// Total over the status enum: every task maps to exactly one lane, so
/// the three lanes always partition the view.
#[must_use]
pub const fn lane_for(task: &Task) -> TaskStatus {
    task.status
}

/// The three-lane board derived from one client's current view.
///
/// A value of this type is a snapshot: it is recomputed from the
/// reconciled set after every change rather than patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pending: Vec<Task>,
    in_progress: Vec<Task>,
    completed: Vec<Task>,
}

impl BoardView {
    /// Partitions a view into lanes. Relative order within each lane
    /// follows the input order.
    #[must_use]
    pub fn project(tasks: Vec<Task>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            match lane_for(&task) {
                TaskStatus::Pending => board.pending.push(task),
                TaskStatus::InProgress => board.in_progress.push(task),
                TaskStatus::Completed => board.completed.push(task),
            }
        }
        board
    }

    /// The cards in one lane.
    #[must_use]
    pub fn lane(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Pending => &self.pending,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Completed => &self.completed,
        }
    }

    /// Total number of cards across all lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.in_progress.len() + self.completed.len()
    }

    /// Whether the board has no cards at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
