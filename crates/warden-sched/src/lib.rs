//! warden-sched: recurring security-task scheduling.
//!
//! A [`Scheduler`] tick selects due schedule entries, runs each task through
//! the [`TaskRunner`], persists the outcome, and reschedules with a fixed
//! delay measured from completion time.

pub mod registry;
pub mod runner;
pub mod scheduler;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub use registry::TaskRegistry;
pub use runner::{ExecutionOutcome, TaskRunner};
pub use scheduler::{Scheduler, SchedulerError, TickReport};

/// Errors a task implementation can surface from [`Task::run`].
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Recoverable failure; the entry stays enabled and is rescheduled.
    #[error("{0}")]
    Failed(String),
    /// The task cannot run with its current configuration; the entry is
    /// disabled until an administrator intervenes.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

/// What a task run receives from the scheduler.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// The tick time this run was selected at.
    pub started_at: DateTime<Utc>,
    /// Directory for task-owned state (snapshots, baselines).
    pub data_dir: PathBuf,
    /// Signalled when the runner gives up on this run. Cooperative tasks
    /// should stop at the next convenient point; the contract has no
    /// forcible interruption.
    pub cancel: CancellationToken,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default)]
pub struct TaskReport {
    pub detail: Option<String>,
}

impl TaskReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }
}

/// One schedulable task type. Implementations are registered once at
/// startup and immutable thereafter.
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable identifier (e.g. "backup").
    fn id(&self) -> &str;

    /// Display name.
    fn label(&self) -> &str;

    /// Interval used when an administrator first enables this task.
    fn default_interval(&self) -> Duration;

    /// Perform the work.
    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError>;
}
