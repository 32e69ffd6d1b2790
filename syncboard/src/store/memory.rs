//! In-memory canonical task list.
//!
//! Stands in for the backend inside one process: every session's client
//! talks to the same [`InMemoryTaskStore`], which owns the task list,
//! applies the write rules, and publishes one event per accepted write
//! on the shared topic.

use std::sync::Arc;

use tokio::sync::RwLock;

use syncboard_proto::event::BoardEvent;
use syncboard_proto::task::{
    Assignee, Task, TaskDraft, TaskEdit, TaskId, TaskStatus, Timestamp, UserId,
};

use crate::channel::TopicPublisher;
use crate::directory::{Directory, Role, Session};

use super::{StoreError, TaskStore};

struct Inner {
    directory: Arc<Directory>,
    publisher: TopicPublisher,
    /// Canonical list, newest first.
    tasks: RwLock<Vec<Task>>,
}

/// Shared in-process task store.
///
/// Cheap to clone; clones share one task list. Events are published
/// after the write lock is released, so a slow topic never blocks other
/// writers. A publish failure is logged and otherwise ignored — the
/// write has already happened and polling will deliver it.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    inner: Arc<Inner>,
}

impl InMemoryTaskStore {
    /// Create an empty store resolving assignees against `directory` and
    /// announcing writes through `publisher`.
    #[must_use]
    pub fn new(directory: Arc<Directory>, publisher: TopicPublisher) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                publisher,
                tasks: RwLock::new(Vec::new()),
            }),
        }
    }

    fn resolve_assignees(&self, ids: &[UserId]) -> Result<Vec<Assignee>, StoreError> {
        ids.iter()
            .map(|id| {
                self.inner
                    .directory
                    .profile(id)
                    .map(|profile| Assignee {
                        id: profile.id.clone(),
                        name: profile.name.clone(),
                    })
                    .ok_or_else(|| StoreError::UnknownAssignee(id.clone()))
            })
            .collect()
    }

    fn publish(&self, event: &BoardEvent) {
        match self.inner.publisher.publish(event) {
            Ok(reached) => {
                tracing::debug!(
                    kind = %event.kind,
                    task_id = %event.task.id,
                    reached,
                    "published board event"
                );
            }
            Err(err) => {
                tracing::warn!(kind = %event.kind, error = %err, "failed to encode board event");
            }
        }
    }
}

fn require_admin(session: &Session, action: &'static str) -> Result<(), StoreError> {
    if session.profile.role == Role::Admin {
        Ok(())
    } else {
        Err(StoreError::Forbidden(action))
    }
}

impl TaskStore for InMemoryTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.inner.tasks.read().await.clone())
    }

    async fn create(&self, session: &Session, draft: TaskDraft) -> Result<Task, StoreError> {
        require_admin(session, "create tasks")?;
        let task = Task {
            id: TaskId::new(),
            title: draft.title,
            description: draft.description,
            status: TaskStatus::Pending,
            completed_by: None,
            assignees: self.resolve_assignees(&draft.assignees)?,
            created_at: Timestamp::now(),
        };
        task.validate()?;

        self.inner.tasks.write().await.insert(0, task.clone());
        self.publish(&BoardEvent::created(task.clone()));
        Ok(task)
    }

    async fn update(
        &self,
        session: &Session,
        id: &TaskId,
        edit: TaskEdit,
    ) -> Result<Task, StoreError> {
        require_admin(session, "edit tasks")?;
        let assignees = self.resolve_assignees(&edit.assignees)?;

        let updated = {
            let mut tasks = self.inner.tasks.write().await;
            let task = tasks
                .iter_mut()
                .find(|task| &task.id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            let mut candidate = task.clone();
            candidate.title = edit.title;
            candidate.description = edit.description;
            candidate.status = edit.status;
            candidate.assignees = assignees;
            // An edit that keeps the task completed keeps its completer;
            // one that completes it stamps the acting user.
            candidate.completed_by = if edit.status == TaskStatus::Completed {
                candidate
                    .completed_by
                    .or_else(|| Some(session.profile.id.clone()))
            } else {
                None
            };
            candidate.validate()?;

            task.clone_from(&candidate);
            candidate
        };

        self.publish(&BoardEvent::updated(updated.clone()));
        Ok(updated)
    }

    async fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        let updated = {
            let mut tasks = self.inner.tasks.write().await;
            let task = tasks
                .iter_mut()
                .find(|task| &task.id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            let mut candidate = task.clone();
            candidate.status = status;
            candidate.completed_by = if status == TaskStatus::Completed {
                Some(session.profile.id.clone())
            } else {
                None
            };
            candidate.validate()?;

            task.clone_from(&candidate);
            candidate
        };

        self.publish(&BoardEvent::status_changed(updated.clone()));
        Ok(updated)
    }
}
