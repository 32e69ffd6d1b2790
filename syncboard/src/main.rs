//! Syncboard demo — two live sessions sharing one board.
//!
//! Seeds the demo directory, starts an admin and an employee client
//! against the same store and event topic, and runs a scripted session:
//! the admin stocks the board, the employee drags their assignment
//! across the lanes, and both boards are logged at the end.
//!
//! ```bash
//! # Run the scripted demo
//! cargo run --bin syncboard
//!
//! # Follow a different employee, with fast polling and verbose logs
//! cargo run --bin syncboard -- --employee Casey --poll-interval-secs 2 --log-level debug
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use syncboard::board::{BoardView, DropTarget};
use syncboard::channel::LocalTopic;
use syncboard::client::{BoardClient, BoardNotice};
use syncboard::config::{BoardConfig, CliArgs};
use syncboard::directory::Directory;
use syncboard::store::InMemoryTaskStore;
use syncboard::sync::FieldPatch;
use syncboard_proto::task::{Assignee, TaskDraft, TaskStatus};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match BoardConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            BoardConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("syncboard demo starting");

    if let Err(e) = run_demo(&config).await {
        tracing::error!(error = %e, "demo failed");
        std::process::exit(1);
    }

    tracing::info!("syncboard demo complete");
}

/// Initialize logging to stderr, or to a file when `--log-file` is given.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed; `None` when logging straight to stderr.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(log_path) = file_path {
        let log_dir = log_path.parent()?;
        let file_name = log_path.file_name()?.to_str()?;
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        None
    }
}

/// The scripted two-session demo.
async fn run_demo(config: &BoardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directory = Arc::new(Directory::seed_demo());
    let topic = LocalTopic::with_capacity(config.topic_capacity);
    let store = InMemoryTaskStore::new(Arc::clone(&directory), topic.publisher());

    let (admin, admin_notices) = BoardClient::new(
        directory.login(&config.admin_name)?,
        store.clone(),
        topic.subscribe(),
        config.notice_buffer,
    );
    let admin = Arc::new(admin);

    let (employee, employee_notices) = BoardClient::new(
        directory.login(&config.employee_name)?,
        store,
        topic.subscribe(),
        config.notice_buffer,
    );
    let employee = Arc::new(employee);

    let background = vec![
        admin.spawn_feed(),
        employee.spawn_feed(),
        admin.spawn_poller(config.poll_interval),
        employee.spawn_poller(config.poll_interval),
        spawn_notice_logger(config.admin_name.clone(), admin_notices),
        spawn_notice_logger(config.employee_name.clone(), employee_notices),
    ];

    admin.refresh().await?;
    employee.refresh().await?;

    let employee_profile = employee.session().profile.clone();

    // The admin stocks the board.
    let onboarding = admin
        .create_task(TaskDraft {
            title: "Draft the onboarding guide".into(),
            description: Some("Outline first, then flesh out each section".into()),
            assignees: vec![employee_profile.id.clone()],
        })
        .await?;
    admin
        .create_task(TaskDraft {
            title: "Rotate the staging credentials".into(),
            description: None,
            assignees: Vec::new(),
        })
        .await?;
    let review = admin
        .create_task(TaskDraft {
            title: "Review the quarterly metrics".into(),
            description: None,
            assignees: Vec::new(),
        })
        .await?;
    settle().await;

    // The employee picks up their assignment and works it across the
    // board; each drag renders locally first and the admin's feed
    // catches up behind it.
    employee
        .move_task(&onboarding.id, &DropTarget::Lane(TaskStatus::InProgress))
        .await?;
    settle().await;
    employee
        .move_task(&onboarding.id, &DropTarget::Lane(TaskStatus::Completed))
        .await?;
    settle().await;

    // The admin hands the review task over; the employee's board grows a
    // card without any call on their side.
    admin
        .edit_task(&review.id, FieldPatch {
            title: review.title.clone(),
            description: Some("Focus on the churn numbers".into()),
            status: review.status,
            assignees: vec![Assignee {
                id: employee_profile.id,
                name: employee_profile.name,
            }],
        })
        .await?;
    settle().await;

    // Employees cannot stock the board; the rejection goes back to the
    // create form rather than through a notice.
    if let Err(err) = employee
        .create_task(TaskDraft {
            title: "Take the afternoon off".into(),
            description: None,
            assignees: Vec::new(),
        })
        .await
    {
        tracing::info!(user = %config.employee_name, error = %err, "create rejected");
    }

    log_board(&config.admin_name, &admin.board());
    log_board(&config.employee_name, &employee.board());

    for task in background {
        task.abort();
    }
    Ok(())
}

/// Logs every lane of a session's board.
fn log_board(user: &str, board: &BoardView) {
    for status in TaskStatus::ALL {
        let titles: Vec<&str> = board
            .lane(status)
            .iter()
            .map(|task| task.title.as_str())
            .collect();
        tracing::info!(user, lane = %status, ?titles, "lane state");
    }
}

/// Logs a session's notices as they arrive.
fn spawn_notice_logger(
    user: String,
    mut notices: mpsc::Receiver<BoardNotice>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice {
                BoardNotice::ViewChanged => {
                    tracing::debug!(user = %user, "board view changed");
                }
                BoardNotice::UpdateFailed { task_id, message } => {
                    tracing::info!(user = %user, task_id = %task_id, message, "change rejected");
                }
                BoardNotice::FeedLagged { skipped } => {
                    tracing::info!(user = %user, skipped, "feed lagged, board reloaded");
                }
            }
        }
    })
}

/// Gives the background feeds a moment to merge published events.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
