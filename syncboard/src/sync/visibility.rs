//! Role-based visibility predicate.
//!
//! Decides whether a task belongs in a given client's reconciled set. The
//! predicate is re-evaluated on every remote merge and never cached: the
//! assignee set changes over a task's life, and removal from a board is
//! inferred from the predicate failing, not from any delete event.

use syncboard_proto::task::{Task, UserId};

use crate::directory::{Role, Session};

/// The identity and role a session views the board as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Viewing identity.
    pub id: UserId,
    /// Viewing role.
    pub role: Role,
}

impl Viewer {
    /// Creates a viewer from raw parts.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether `task` belongs in this viewer's reconciled set.
    ///
    /// Admins see every task; employees see a task iff their identity is in
    /// its assignee set.
    #[must_use]
    pub fn can_see(&self, task: &Task) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Employee => task.is_assigned(&self.id),
        }
    }
}

impl From<&Session> for Viewer {
    fn from(session: &Session) -> Self {
        Self::new(session.profile.id.clone(), session.profile.role)
    }
}
