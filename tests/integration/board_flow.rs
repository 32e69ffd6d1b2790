//! Integration tests for the full board pipeline: admin and employee
//! clients sharing one store and one event topic.
//!
//! Verifies:
//! 1. A created task reaches every subscribed board exactly once,
//!    including the writer's own.
//! 2. Drag-and-drop walks a card across lanes optimistically and the
//!    store confirmation stamps `completed_by`.
//! 3. Rejected writes roll back the board, notify, and leave the store
//!    untouched.
//! 4. Duplicate and stale deliveries follow the merge rules, and a
//!    reload repairs a delivery-order regression.
//! 5. A mutation superseded before its confirmation lands is not
//!    cancelled: the stale success resurrects the abandoned state until
//!    later events repair the view.
//! 6. Background feed and poll loops converge without explicit pumping.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};

use syncboard::board::DropTarget;
use syncboard::channel::{LocalTopic, TopicSubscriber};
use syncboard::client::{BoardClient, BoardNotice, SyncStep};
use syncboard::directory::{Directory, Session};
use syncboard::store::{InMemoryTaskStore, StoreError, TaskStore};
use syncboard::sync::{FieldPatch, MergeOutcome};
use syncboard_proto::event::BoardEvent;
use syncboard_proto::task::{Assignee, Task, TaskDraft, TaskEdit, TaskId, TaskStatus, UserId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Client = BoardClient<InMemoryTaskStore, TopicSubscriber>;

/// One store and one topic shared by every client in a test.
struct World {
    directory: Arc<Directory>,
    topic: LocalTopic,
    store: InMemoryTaskStore,
}

fn world() -> World {
    let directory = Arc::new(Directory::seed_demo());
    let topic = LocalTopic::new();
    let store = InMemoryTaskStore::new(Arc::clone(&directory), topic.publisher());
    World {
        directory,
        topic,
        store,
    }
}

/// Logs `name` in and wires a client onto the shared store and topic.
fn client_for(world: &World, name: &str) -> (Client, mpsc::Receiver<BoardNotice>) {
    let session = world.directory.login(name).expect("demo user should exist");
    BoardClient::new(session, world.store.clone(), world.topic.subscribe(), 64)
}

fn user_id(world: &World, name: &str) -> UserId {
    world
        .directory
        .find_by_name(name)
        .expect("demo user should exist")
        .id
        .clone()
}

fn draft_for(title: &str, assignee: UserId) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: None,
        assignees: vec![assignee],
    }
}

/// A field patch that reproduces `task` as it stands.
fn fields_of(task: &Task) -> FieldPatch {
    FieldPatch {
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status,
        assignees: task.assignees.clone(),
    }
}

fn titles(lane: &[Task]) -> Vec<&str> {
    lane.iter().map(|task| task.title.as_str()).collect()
}

fn drain(rx: &mut mpsc::Receiver<BoardNotice>) -> Vec<BoardNotice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

/// Polls `check` until it holds or a two second deadline passes.
async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(10)).await;
    }
}

// ===========================================================================
// Creation fans out to every subscribed board
// ===========================================================================

#[tokio::test]
async fn created_task_reaches_every_subscribed_board() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Ship the beta", user_id(&world, "Alex")))
        .await
        .expect("admin create should succeed");
    assert_eq!(task.completed_by, None);

    // The writer's board shows the confirmed task before touching the feed.
    assert_eq!(
        titles(admin.board().lane(TaskStatus::Pending)),
        ["Ship the beta"]
    );

    // The assigned employee picks it up from the event feed.
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Inserted)
    );
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Pending)),
        ["Ship the beta"]
    );

    // The writer's own copy of the event is absorbed, not re-applied.
    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Unchanged)
    );
    assert_eq!(admin.tasks(), alex.tasks());
}

// ===========================================================================
// Drag-and-drop walks the card across lanes with store confirmation
// ===========================================================================

#[tokio::test]
async fn drag_walks_a_card_across_lanes_and_completion_is_stamped() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    let alex_id = user_id(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Write the release notes", alex_id.clone()))
        .await
        .expect("create");
    alex.sync_one().await.expect("sync");
    admin.sync_one().await.expect("sync");

    // Pending to InProgress renders on the dragging client right away.
    let moved = alex
        .move_task(&task.id, &DropTarget::Lane(TaskStatus::InProgress))
        .await
        .expect("move should reach the store");
    assert!(moved, "a cross-lane drop should issue a status change");
    assert!(alex.board().lane(TaskStatus::Pending).is_empty());
    assert_eq!(
        titles(alex.board().lane(TaskStatus::InProgress)),
        ["Write the release notes"]
    );

    // The other client converges through the feed.
    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        titles(admin.board().lane(TaskStatus::InProgress)),
        ["Write the release notes"]
    );
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Unchanged)
    );

    // InProgress to Completed; the store stamps who completed it.
    let moved = alex
        .move_task(&task.id, &DropTarget::Lane(TaskStatus::Completed))
        .await
        .expect("move should reach the store");
    assert!(moved);
    let completed = &alex.tasks()[0];
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.completed_by, Some(alex_id.clone()));

    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(admin.tasks()[0].completed_by, Some(alex_id));
    alex.sync_one().await.expect("sync");
    assert_eq!(admin.tasks(), alex.tasks());
}

#[tokio::test]
async fn dropping_onto_a_card_adopts_that_cards_lane() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    let alex_id = user_id(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let dragged = admin
        .create_task(draft_for("Tidy the backlog", alex_id.clone()))
        .await
        .expect("create");
    let anchor = admin
        .create_task(draft_for("Chase the vendor quote", alex_id))
        .await
        .expect("create");
    admin
        .change_status(&anchor.id, TaskStatus::InProgress)
        .await
        .expect("status change");
    for _ in 0..3 {
        alex.sync_one().await.expect("sync");
        admin.sync_one().await.expect("sync");
    }

    let moved = alex
        .move_task(&dragged.id, &DropTarget::Card(anchor.id.clone()))
        .await
        .expect("move should reach the store");
    assert!(moved, "dropping onto a card in another lane moves the dragged task");
    assert_eq!(
        titles(alex.board().lane(TaskStatus::InProgress)),
        ["Chase the vendor quote", "Tidy the backlog"]
    );

    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        titles(admin.board().lane(TaskStatus::InProgress)),
        ["Chase the vendor quote", "Tidy the backlog"]
    );
}

// ===========================================================================
// Drops that imply no move touch nothing
// ===========================================================================

#[tokio::test]
async fn same_lane_and_self_drops_issue_nothing() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("File the expense report", user_id(&world, "Alex")))
        .await
        .expect("create");
    alex.sync_one().await.expect("sync");
    admin.sync_one().await.expect("sync");

    let same_lane = alex
        .move_task(&task.id, &DropTarget::Lane(TaskStatus::Pending))
        .await
        .expect("resolve");
    let onto_self = alex
        .move_task(&task.id, &DropTarget::Card(task.id.clone()))
        .await
        .expect("resolve");
    assert!(!same_lane);
    assert!(!onto_self);

    // The store never saw a write.
    let listed = world.store.list().await.expect("list");
    assert_eq!(listed[0].status, TaskStatus::Pending);

    // And no event went out: the next frame each client sees is the
    // following real write.
    admin
        .change_status(&task.id, TaskStatus::InProgress)
        .await
        .expect("status change");
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
}

// ===========================================================================
// A full edit replaces every editable field at once
// ===========================================================================

#[tokio::test]
async fn edit_replaces_title_description_status_and_assignees() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    let (blair, _blair_notices) = client_for(&world, "Blair");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");
    blair.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Draft the press release", user_id(&world, "Alex")))
        .await
        .expect("create");
    alex.sync_one().await.expect("sync");
    admin.sync_one().await.expect("sync");
    blair.sync_one().await.expect("sync");

    let mut fields = fields_of(&task);
    fields.title = "Draft and fact-check the press release".to_string();
    fields.description = Some("Legal wants a pass before Friday".to_string());
    fields.status = TaskStatus::InProgress;
    fields.assignees.push(Assignee {
        id: user_id(&world, "Blair"),
        name: "Blair".to_string(),
    });

    let applied = admin
        .edit_task(&task.id, fields)
        .await
        .expect("edit should reach the store");
    assert!(applied);

    let edited = &admin.tasks()[0];
    assert_eq!(edited.title, "Draft and fact-check the press release");
    assert_eq!(
        edited.description.as_deref(),
        Some("Legal wants a pass before Friday")
    );
    assert_eq!(edited.status, TaskStatus::InProgress);
    assert_eq!(edited.assignees.len(), 2);

    // Alex keeps the card, Blair gains it.
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        blair.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Inserted)
    );
    assert_eq!(alex.tasks(), blair.tasks());
}

// ===========================================================================
// Rejected writes roll back, notify, and leave the store untouched
// ===========================================================================

#[tokio::test]
async fn rejected_edit_rolls_back_notifies_and_leaves_the_store_alone() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, mut alex_notices) = client_for(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Retire the legacy queue", user_id(&world, "Alex")))
        .await
        .expect("create");
    alex.sync_one().await.expect("sync");
    let board_before = alex.tasks();
    let store_before = world.store.list().await.expect("list");
    drain(&mut alex_notices);

    let mut fields = fields_of(&task);
    fields.title = "Retire the legacy queue today".to_string();
    let applied = alex
        .edit_task(&task.id, fields)
        .await
        .expect("the request itself should go out");
    assert!(!applied, "employees may not edit, so the write must be rejected");

    assert_eq!(alex.tasks(), board_before, "the optimistic edit must be rolled back");
    assert_eq!(world.store.list().await.expect("list"), store_before);
    assert_eq!(
        drain(&mut alex_notices),
        [
            BoardNotice::ViewChanged,
            BoardNotice::ViewChanged,
            BoardNotice::UpdateFailed {
                task_id: task.id.clone(),
                message: "only admins may edit tasks".to_string(),
            },
        ]
    );
}

// ===========================================================================
// Duplicate and stale deliveries follow the merge rules
// ===========================================================================

#[tokio::test]
async fn duplicate_event_is_absorbed_after_the_first_merge() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Renew the domain", user_id(&world, "Alex")))
        .await
        .expect("create");
    alex.sync_one().await.expect("sync");
    admin.sync_one().await.expect("sync");

    // The broker redelivers one update twice.
    let mut renamed = task.clone();
    renamed.title = "Renew the domain and the certs".to_string();
    let publisher = world.topic.publisher();
    publisher
        .publish(&BoardEvent::updated(renamed.clone()))
        .expect("publish");
    publisher
        .publish(&BoardEvent::updated(renamed))
        .expect("publish");

    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Unchanged)
    );
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Pending)),
        ["Renew the domain and the certs"]
    );

    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        admin.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Unchanged)
    );
    assert_eq!(admin.tasks(), alex.tasks());
}

#[tokio::test]
async fn late_stale_delivery_regresses_and_a_reload_repairs_it() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Index the archive", user_id(&world, "Alex")))
        .await
        .expect("create");
    let stale = task.clone();
    alex.sync_one().await.expect("sync");

    let mut fields = fields_of(&task);
    fields.title = "Index and dedupe the archive".to_string();
    admin.edit_task(&task.id, fields).await.expect("edit");
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Pending)),
        ["Index and dedupe the archive"]
    );

    // A delayed copy of the original state arrives after the edit. The
    // whole-payload rule makes delivery order authoritative, so the view
    // regresses rather than guessing.
    world
        .topic
        .publisher()
        .publish(&BoardEvent::updated(stale))
        .expect("publish");
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Pending)),
        ["Index the archive"]
    );

    // The store still holds the truth; the poll path restores it.
    alex.refresh().await.expect("refresh");
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Pending)),
        ["Index and dedupe the archive"]
    );
}

// ===========================================================================
// A mutation superseded mid-flight is not cancelled
// ===========================================================================

/// Wraps the real store so that `update_status` writes land immediately
/// but the confirmation for `held` is parked until the test releases it.
/// The `parked` side fires once the held write is in, so the test can
/// sequence the race deterministically.
struct HeldConfirmationStore {
    inner: InMemoryTaskStore,
    held: TaskStatus,
    parked: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl HeldConfirmationStore {
    fn new(
        inner: InMemoryTaskStore,
        held: TaskStatus,
    ) -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (parked_tx, parked_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let store = Self {
            inner,
            held,
            parked: Mutex::new(Some(parked_tx)),
            release: Mutex::new(Some(release_rx)),
        };
        (store, parked_rx, release_tx)
    }
}

impl TaskStore for HeldConfirmationStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.inner.list().await
    }

    async fn create(&self, session: &Session, draft: TaskDraft) -> Result<Task, StoreError> {
        self.inner.create(session, draft).await
    }

    async fn update(
        &self,
        session: &Session,
        id: &TaskId,
        edit: TaskEdit,
    ) -> Result<Task, StoreError> {
        self.inner.update(session, id, edit).await
    }

    async fn update_status(
        &self,
        session: &Session,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        let task = self.inner.update_status(session, id, status).await?;
        if status == self.held {
            if let Some(parked) = self.parked.lock().take() {
                let _ = parked.send(());
            }
            let release = self.release.lock().take();
            if let Some(release) = release {
                let _ = release.await;
            }
        }
        Ok(task)
    }
}

#[tokio::test]
async fn a_stale_confirmation_resurrects_a_superseded_drag_and_events_repair_it() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let alex_id = user_id(&world, "Alex");
    let (slow_store, parked, release) =
        HeldConfirmationStore::new(world.store.clone(), TaskStatus::InProgress);
    let session = world.directory.login("Alex").expect("demo user should exist");
    let (alex, _alex_notices) = BoardClient::new(session, slow_store, world.topic.subscribe(), 64);
    let alex = Arc::new(alex);
    admin.refresh().await.expect("refresh");

    let task = admin
        .create_task(draft_for("Stage the rollout", alex_id.clone()))
        .await
        .expect("create");
    alex.refresh().await.expect("refresh");
    alex.sync_one().await.expect("sync");

    // First drag: the write lands in the store, its confirmation parks.
    let racing = tokio::spawn({
        let alex = Arc::clone(&alex);
        let id = task.id.clone();
        async move { alex.change_status(&id, TaskStatus::InProgress).await }
    });
    parked.await.expect("the held write should arrive");
    assert_eq!(
        titles(alex.board().lane(TaskStatus::InProgress)),
        ["Stage the rollout"]
    );

    // Second drag supersedes the first and confirms straight away.
    let moved = alex
        .change_status(&task.id, TaskStatus::Completed)
        .await
        .expect("the superseding change should reach the store");
    assert!(moved);
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Completed)),
        ["Stage the rollout"]
    );
    assert_eq!(alex.tasks()[0].completed_by, Some(alex_id.clone()));

    // The stale success lands last; delivery order is authoritative, so
    // the abandoned intermediate state comes back, unstamped.
    release.send(()).expect("the parked call should be waiting");
    let moved = racing
        .await
        .expect("join")
        .expect("the held change should resolve");
    assert!(moved);
    assert_eq!(
        titles(alex.board().lane(TaskStatus::InProgress)),
        ["Stage the rollout"]
    );
    assert!(alex.board().lane(TaskStatus::Completed).is_empty());
    assert_eq!(alex.tasks()[0].completed_by, None);

    // The queued events settle it: the stale write's own event changes
    // nothing, the superseding write's event restores the final state.
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Unchanged)
    );
    assert_eq!(
        alex.sync_one().await.expect("sync"),
        SyncStep::Merged(MergeOutcome::Updated)
    );
    assert_eq!(
        titles(alex.board().lane(TaskStatus::Completed)),
        ["Stage the rollout"]
    );
    assert_eq!(alex.tasks()[0].completed_by, Some(alex_id));
}

// ===========================================================================
// Background loops converge without explicit pumping
// ===========================================================================

#[tokio::test]
async fn background_feed_and_poller_converge_two_live_clients() {
    let world = world();
    let (admin, _admin_notices) = client_for(&world, "Morgan");
    let (alex, _alex_notices) = client_for(&world, "Alex");
    let alex_id = user_id(&world, "Alex");
    let admin = Arc::new(admin);
    let alex = Arc::new(alex);
    admin.refresh().await.expect("refresh");
    alex.refresh().await.expect("refresh");

    // Admin follows the live feed; Alex only polls.
    let feed = admin.spawn_feed();
    let poller = alex.spawn_poller(Duration::from_millis(20));

    let task = admin
        .create_task(draft_for("Prepare the demo data", alex_id.clone()))
        .await
        .expect("create");
    eventually("the poller to deliver the new task", || {
        !alex.board().is_empty()
    })
    .await;

    alex.move_task(&task.id, &DropTarget::Lane(TaskStatus::Completed))
        .await
        .expect("move");
    eventually("the feed to deliver the completion", || {
        admin.board().lane(TaskStatus::Completed).len() == 1
    })
    .await;
    assert_eq!(admin.tasks()[0].completed_by, Some(alex_id));

    feed.abort();
    poller.abort();
}
