//! Per-session board client.
//!
//! Contains the [`BoardClient`] which wires one session's view together:
//! optimistic writes against the store (apply -> request -> confirm or
//! roll back), event-driven merges from the shared topic, and the
//! periodic full reload that backstops both.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use syncboard_proto::event::EventKind;
use syncboard_proto::task::{Task, TaskDraft, TaskEdit, TaskId, TaskStatus};

use crate::board::{self, BoardView, DropTarget};
use crate::channel::{ChannelError, EventFeed};
use crate::directory::Session;
use crate::store::{StoreError, TaskStore};
use crate::sync::{FieldPatch, MergeOutcome, SyncEngine, SyncError, TaskPatch, Viewer};

/// Errors that can surface from client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A local patch could not be applied.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The store rejected or failed a request.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The event feed has ended and no more merges will arrive.
    #[error("event feed closed")]
    FeedClosed,
}

/// Notifications emitted for the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardNotice {
    /// The reconciled set changed; the board should re-render.
    ViewChanged,
    /// A write was rejected and its optimistic effect rolled back.
    UpdateFailed {
        /// The task whose change was rejected.
        task_id: TaskId,
        /// Human-readable reason, suitable for a toast.
        message: String,
    },
    /// The event feed dropped frames and the board was reloaded.
    FeedLagged {
        /// Number of events that were lost.
        skipped: u64,
    },
}

/// What one call to [`BoardClient::sync_one`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// An event was merged with the given outcome.
    Merged(MergeOutcome),
    /// The feed lagged; the full snapshot was reloaded instead.
    Reloaded,
    /// The frame was dropped (undecodable or invalid payload).
    Skipped,
}

/// Orchestrates one session's live view of the board.
///
/// Local mutations go through the optimistic pipeline: patch the engine,
/// issue the store request, then either merge the confirmed task or roll
/// the patch back and notify. Remote mutations arrive as full-task
/// events on the feed and go through the same merge. Either path ends in
/// the engine, so the view converges no matter which side ran first.
///
/// All methods take `&self`; the engine sits behind a mutex that is
/// never held across an await point.
pub struct BoardClient<S: TaskStore, F: EventFeed> {
    /// The authenticated session this client acts as.
    session: Session,
    /// The store requests are issued against.
    store: S,
    /// The inbound event feed for this session.
    feed: F,
    /// The session's reconciled task set.
    engine: parking_lot::Mutex<SyncEngine>,
    /// Channel for notifying the view layer.
    notice_tx: mpsc::Sender<BoardNotice>,
}

impl<S: TaskStore, F: EventFeed> BoardClient<S, F> {
    /// Creates a client for `session`.
    ///
    /// Returns the client and a receiver for [`BoardNotice`]s that the
    /// view layer should consume. The local set starts empty; call
    /// [`refresh`](Self::refresh) to load the first snapshot.
    pub fn new(
        session: Session,
        store: S,
        feed: F,
        notice_buffer: usize,
    ) -> (Self, mpsc::Receiver<BoardNotice>) {
        let (notice_tx, notice_rx) = mpsc::channel(notice_buffer);
        let client = Self {
            engine: parking_lot::Mutex::new(SyncEngine::new(Viewer::from(&session))),
            session,
            store,
            feed,
            notice_tx,
        };
        (client, notice_rx)
    }

    /// The session this client acts as.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The current reconciled task list, newest first.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.engine.lock().current_view()
    }

    /// The current three-lane board.
    #[must_use]
    pub fn board(&self) -> BoardView {
        BoardView::project(self.tasks())
    }

    /// Replaces the local set with a fresh store snapshot.
    ///
    /// Used on startup and as the recovery path when the feed lags. The
    /// same visibility filtering applies as for event merges, so a
    /// reload never shows an employee more than their assignments.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the snapshot fetch fails.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let tasks = self.store.list().await?;
        self.engine.lock().load_all(tasks);
        self.notify(BoardNotice::ViewChanged);
        Ok(())
    }

    /// Creates a task and admits it into the local set once confirmed.
    ///
    /// Creation is not optimistic — the task id only exists once the
    /// store has accepted the draft, so nothing renders until then.
    /// Rejections propagate to the caller for the create form to show.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store rejects the draft
    /// (non-admin session, invalid title, unknown assignee).
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, ClientError> {
        let task = self.store.create(&self.session, draft).await?;
        self.merge_confirmed(task.clone(), EventKind::TaskCreated);
        Ok(task)
    }

    /// Moves a task to a status through the optimistic pipeline.
    ///
    /// The lane change renders immediately. On store rejection the
    /// previous state is restored and a [`BoardNotice::UpdateFailed`]
    /// is emitted; the call then resolves to `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Sync`] if the task is not in the local
    /// set, or [`ClientError::Store`] if the request itself could not
    /// be issued.
    pub async fn change_status(&self, id: &TaskId, to: TaskStatus) -> Result<bool, ClientError> {
        let snapshot = self
            .engine
            .lock()
            .apply_optimistic(id, &TaskPatch::Status(to))?;
        self.notify(BoardNotice::ViewChanged);

        match self.store.update_status(&self.session, id, to).await {
            Ok(task) => {
                self.merge_confirmed(task, EventKind::TaskStatusChanged);
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "status change rejected, rolling back");
                self.engine.lock().rollback(id, snapshot);
                self.notify(BoardNotice::ViewChanged);
                self.notify(BoardNotice::UpdateFailed {
                    task_id: id.clone(),
                    message: err.to_string(),
                });
                Ok(false)
            }
        }
    }

    /// Resolves a finished drag and, if it implies a move, runs it
    /// through [`change_status`](Self::change_status).
    ///
    /// Same-lane drops, self drops, and targets that vanished mid-drag
    /// all resolve to `Ok(false)` without touching anything.
    ///
    /// # Errors
    ///
    /// Propagates [`change_status`](Self::change_status) errors.
    pub async fn move_task(
        &self,
        dragged: &TaskId,
        target: &DropTarget,
    ) -> Result<bool, ClientError> {
        let change = board::resolve_drop(&self.tasks(), dragged, target);
        match change {
            Some(change) => self.change_status(&change.task_id, change.to).await,
            None => Ok(false),
        }
    }

    /// Replaces a task's editable fields through the optimistic
    /// pipeline.
    ///
    /// Same contract as [`change_status`](Self::change_status): the edit
    /// renders immediately, a rejection rolls it back, notifies, and
    /// resolves to `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Sync`] if the task is not in the local set
    /// or the patch fails validation.
    pub async fn edit_task(&self, id: &TaskId, fields: FieldPatch) -> Result<bool, ClientError> {
        let snapshot = self
            .engine
            .lock()
            .apply_optimistic(id, &TaskPatch::Fields(fields.clone()))?;
        self.notify(BoardNotice::ViewChanged);

        let edit = TaskEdit {
            title: fields.title,
            description: fields.description,
            status: fields.status,
            assignees: fields.assignees.into_iter().map(|a| a.id).collect(),
        };
        match self.store.update(&self.session, id, edit).await {
            Ok(task) => {
                self.merge_confirmed(task, EventKind::TaskUpdated);
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "edit rejected, rolling back");
                self.engine.lock().rollback(id, snapshot);
                self.notify(BoardNotice::ViewChanged);
                self.notify(BoardNotice::UpdateFailed {
                    task_id: id.clone(),
                    message: err.to_string(),
                });
                Ok(false)
            }
        }
    }

    /// Receives and processes one frame from the event feed.
    ///
    /// Valid events are merged; frames that fail decoding or payload
    /// validation are dropped. A lagged feed falls back to a full
    /// reload, since an unknown number of events is gone for good.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::FeedClosed`] when the feed has ended, or
    /// [`ClientError::Store`] if a lag-triggered reload fails.
    pub async fn sync_one(&self) -> Result<SyncStep, ClientError> {
        match self.feed.next_event().await {
            Ok(event) => {
                if let Err(err) = event.validate() {
                    tracing::warn!(kind = %event.kind, error = %err, "dropping invalid event");
                    return Ok(SyncStep::Skipped);
                }
                let outcome = self.engine.lock().merge_remote(event.task, event.kind);
                if outcome != MergeOutcome::Unchanged {
                    self.notify(BoardNotice::ViewChanged);
                }
                Ok(SyncStep::Merged(outcome))
            }
            Err(ChannelError::Lagged { skipped }) => {
                tracing::warn!(skipped, "event feed lagged, reloading snapshot");
                self.refresh().await?;
                self.notify(BoardNotice::FeedLagged { skipped });
                Ok(SyncStep::Reloaded)
            }
            Err(ChannelError::Codec(err)) => {
                tracing::warn!(error = %err, "dropping undecodable frame");
                Ok(SyncStep::Skipped)
            }
            Err(ChannelError::Closed) => Err(ClientError::FeedClosed),
        }
    }

    fn merge_confirmed(&self, task: Task, kind: EventKind) {
        let outcome = self.engine.lock().merge_remote(task, kind);
        if outcome != MergeOutcome::Unchanged {
            self.notify(BoardNotice::ViewChanged);
        }
    }

    fn notify(&self, notice: BoardNotice) {
        let _ = self.notice_tx.try_send(notice);
    }
}

impl<S, F> BoardClient<S, F>
where
    S: TaskStore + 'static,
    F: EventFeed + 'static,
{
    /// Spawns the background loop that drains the event feed.
    ///
    /// The loop runs until the feed closes or a lag-triggered reload
    /// fails, then logs and exits.
    pub fn spawn_feed(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if let Err(err) = client.sync_one().await {
                    tracing::info!(
                        user = %client.session.profile.name,
                        error = %err,
                        "event loop stopped"
                    );
                    break;
                }
            }
        })
    }

    /// Spawns the periodic full-reload loop.
    ///
    /// Polling reuses [`refresh`](Self::refresh), so it repairs anything
    /// the event path missed. Failed polls are logged and retried on the
    /// next tick.
    pub fn spawn_poller(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = client.refresh().await {
                    tracing::warn!(error = %err, "poll reload failed");
                }
            }
        })
    }
}
