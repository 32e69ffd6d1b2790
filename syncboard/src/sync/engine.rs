//! The per-session reconciliation engine.
//!
//! [`SyncEngine`] owns one client's mapping from task id to Local Task View
//! and keeps it convergent with the store under two independent update
//! paths: confirmations of this client's own requests, and broadcast events
//! from the shared topic. Merging is last-writer-wins at whole-task
//! granularity — payloads are full snapshots, so there is no field-level
//! diffing and no per-field conflict resolution.
//!
//! The engine performs no I/O and never retries. Issuing requests, handling
//! their failures, and calling [`SyncEngine::rollback`] belong to the
//! caller.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use syncboard_proto::event::EventKind;
use syncboard_proto::task::{
    Assignee, MAX_TASK_TITLE_LENGTH, Task, TaskId, TaskStatus, ValidationError,
};

use super::SyncError;
use super::visibility::Viewer;

/// A full-field optimistic edit, mirroring the edit form: every editable
/// field is replaced at once. Assignees arrive already resolved because the
/// form rendered them; `completed_by` is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPatch {
    /// Replacement title.
    pub title: String,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement status.
    pub status: TaskStatus,
    /// Replacement assignee set, display-ready.
    pub assignees: Vec<Assignee>,
}

/// A local optimistic mutation, applied before the network call resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPatch {
    /// Move the task to a status (drag or dedicated control).
    Status(TaskStatus),
    /// Replace the full editable field set (edit form).
    Fields(FieldPatch),
}

impl TaskPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        let Self::Fields(fields) = self else {
            return Ok(());
        };
        if fields.title.is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        let title_chars = fields.title.chars().count();
        if title_chars > MAX_TASK_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong {
                length: title_chars,
                max: MAX_TASK_TITLE_LENGTH,
            });
        }
        Ok(())
    }

    /// Applies the patch. Never sets `completed_by`: the store derives it,
    /// and the local copy clears it whenever the task leaves `Completed` so
    /// the pairing invariant keeps holding locally.
    fn apply_to(&self, task: &mut Task) {
        match self {
            Self::Status(status) => task.status = *status,
            Self::Fields(fields) => {
                task.title = fields.title.clone();
                task.description = fields.description.clone();
                task.status = fields.status;
                task.assignees = fields.assignees.clone();
            }
        }
        if task.status != TaskStatus::Completed {
            task.completed_by = None;
        }
    }
}

/// Where the current value of a Local Task View came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Confirmed by the store (snapshot load, confirmation, or event).
    Confirmed,
    /// An optimistic patch not yet confirmed.
    Optimistic,
}

/// One Local Task View: the task plus its revision marker. Also serves as
/// the rollback token returned by [`SyncEngine::apply_optimistic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    task: Task,
    provenance: Provenance,
}

impl TaskSnapshot {
    /// The task state captured in this snapshot.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// The revision marker captured in this snapshot.
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        self.provenance
    }
}

/// What a remote merge did to the local set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A previously unknown visible task was admitted.
    Inserted,
    /// An existing entry was replaced by the incoming snapshot.
    Updated,
    /// An existing entry left the visible set.
    Removed,
    /// Nothing changed: duplicate payload, or an invisible unknown task.
    Unchanged,
}

/// The reconciled task set for one session.
#[derive(Debug)]
pub struct SyncEngine {
    viewer: Viewer,
    /// View order, newest first. Every id in here has an entry.
    order: Vec<TaskId>,
    entries: HashMap<TaskId, TaskSnapshot>,
}

impl SyncEngine {
    /// Creates an empty engine viewing as `viewer`.
    #[must_use]
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Replaces the entire local set with a fetched snapshot.
    ///
    /// Used on session start and as the recovery path (poll reload, feed
    /// lag). Always succeeds; empty input yields an empty set. Input order
    /// is preserved; entries the viewer cannot see are not admitted.
    pub fn load_all(&mut self, tasks: Vec<Task>) {
        self.order.clear();
        self.entries.clear();
        for task in tasks {
            if !self.viewer.can_see(&task) || self.entries.contains_key(&task.id) {
                continue;
            }
            self.order.push(task.id.clone());
            self.entries.insert(
                task.id.clone(),
                TaskSnapshot {
                    task,
                    provenance: Provenance::Confirmed,
                },
            );
        }
    }

    /// Immediately mutates the local view for `id`, before the network call
    /// resolves, and returns the pre-mutation snapshot the caller must hold
    /// for [`SyncEngine::rollback`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownTask`] if `id` is not in the local set,
    /// or [`SyncError::Invalid`] if a field patch carries an empty or
    /// oversized title.
    pub fn apply_optimistic(
        &mut self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<TaskSnapshot, SyncError> {
        patch.validate()?;
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownTask(id.clone()))?;
        let previous = entry.clone();
        patch.apply_to(&mut entry.task);
        entry.provenance = Provenance::Optimistic;
        Ok(previous)
    }

    /// Restores a pre-mutation snapshot after a failed request.
    ///
    /// The entry is restored bit-for-bit, task and revision marker alike,
    /// keeping its position in the view. If a merge has meanwhile evicted
    /// the entry, the snapshot is re-admitted at the front only while the
    /// visibility predicate still holds for it; the next event or reload
    /// settles such a transient resurrection either way.
    pub fn rollback(&mut self, id: &TaskId, snapshot: TaskSnapshot) {
        if let Some(entry) = self.entries.get_mut(id) {
            *entry = snapshot;
        } else if self.viewer.can_see(&snapshot.task) {
            self.order.insert(0, id.clone());
            self.entries.insert(id.clone(), snapshot);
        }
    }

    /// Applies a server-confirmed or broadcast-delivered task snapshot.
    ///
    /// The incoming representation always wins over local state. Unknown
    /// visible tasks are admitted at the front (store reads are
    /// most-recent-first); known tasks whose assignee set no longer passes
    /// the visibility predicate are removed — removal is inferred from
    /// predicate failure, never from a delete event (none exists). An
    /// incoming object identical to the confirmed local entry is absorbed
    /// silently, which makes duplicate delivery idempotent.
    ///
    /// The event kind never influences the merge decision; every payload is
    /// a full snapshot.
    pub fn merge_remote(&mut self, task: Task, kind: EventKind) -> MergeOutcome {
        let id = task.id.clone();
        let visible = self.viewer.can_see(&task);
        let outcome = match self.entries.entry(id.clone()) {
            Entry::Occupied(mut occupied) if visible => {
                let entry = occupied.get_mut();
                if entry.provenance == Provenance::Confirmed && entry.task == task {
                    MergeOutcome::Unchanged
                } else {
                    entry.task = task;
                    entry.provenance = Provenance::Confirmed;
                    MergeOutcome::Updated
                }
            }
            Entry::Occupied(occupied) => {
                occupied.remove();
                self.order.retain(|o| o != &id);
                MergeOutcome::Removed
            }
            Entry::Vacant(vacant) if visible => {
                vacant.insert(TaskSnapshot {
                    task,
                    provenance: Provenance::Confirmed,
                });
                self.order.insert(0, id.clone());
                MergeOutcome::Inserted
            }
            Entry::Vacant(_) => MergeOutcome::Unchanged,
        };
        tracing::debug!(task_id = %id, event_kind = %kind, outcome = ?outcome, "merged remote task");
        outcome
    }

    /// The present reconciled set, insertion order preserved.
    #[must_use]
    pub fn current_view(&self) -> Vec<Task> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.task.clone()))
            .collect()
    }

    /// The current local state of one task.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.entries.get(id).map(|entry| &entry.task)
    }

    /// The revision marker of one task.
    #[must_use]
    pub fn provenance(&self, id: &TaskId) -> Option<Provenance> {
        self.entries.get(id).map(|entry| entry.provenance)
    }

    /// Number of tasks in the reconciled set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the reconciled set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
