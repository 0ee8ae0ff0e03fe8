//! Task runner — executes a single task with timeout and error capture.
//!
//! Nothing a task does (error, panic, hang) may abort the scheduler's tick;
//! every run collapses into an [`ExecutionOutcome`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use warden_types::TaskOutcome;

use crate::{Task, TaskContext, TaskError};

/// Result of one supervised execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success {
        detail: Option<String>,
    },
    /// Recoverable; the entry is rescheduled.
    Failure {
        reason: String,
    },
    /// The task cannot run as configured; the entry is disabled.
    Fatal {
        reason: String,
    },
}

impl ExecutionOutcome {
    /// Collapse into the persisted outcome form.
    pub fn to_outcome(&self) -> TaskOutcome {
        match self {
            ExecutionOutcome::Success { detail } => TaskOutcome::Success {
                detail: detail.clone(),
            },
            ExecutionOutcome::Failure { reason } | ExecutionOutcome::Fatal { reason } => {
                TaskOutcome::Failure {
                    reason: reason.clone(),
                }
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionOutcome::Fatal { .. })
    }
}

/// Executes tasks under a bounded timeout, isolated from the tick loop.
pub struct TaskRunner {
    timeout: Duration,
}

impl TaskRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run one task to an outcome. Never returns an error and never panics.
    pub async fn execute(
        &self,
        task: Arc<dyn Task>,
        data_dir: PathBuf,
        started_at: DateTime<Utc>,
    ) -> ExecutionOutcome {
        let run_id = Uuid::new_v4();
        let task_id = task.id().to_string();
        let cancel = CancellationToken::new();
        let ctx = TaskContext {
            started_at,
            data_dir,
            cancel: cancel.clone(),
        };

        info!(task = %task_id, run = %run_id, "Task starting");

        // Spawned so a panic is contained in the JoinHandle instead of
        // unwinding through the tick loop.
        let handle = tokio::spawn(async move { task.run(&ctx).await });

        let outcome = match tokio::time::timeout(self.timeout, handle).await {
            Err(_) => {
                // The work is abandoned, not killed. Signal the token so a
                // cooperative task can stop early and release resources.
                cancel.cancel();
                ExecutionOutcome::Failure {
                    reason: "timeout".to_string(),
                }
            }
            Ok(Err(join_err)) => ExecutionOutcome::Failure {
                reason: format!("task panicked: {join_err}"),
            },
            Ok(Ok(Ok(report))) => ExecutionOutcome::Success {
                detail: report.detail,
            },
            Ok(Ok(Err(TaskError::Failed(reason)))) => ExecutionOutcome::Failure { reason },
            Ok(Ok(Err(TaskError::ConfigurationInvalid(reason)))) => ExecutionOutcome::Fatal {
                reason: format!("invalid configuration: {reason}"),
            },
        };

        match &outcome {
            ExecutionOutcome::Success { .. } => {
                info!(task = %task_id, run = %run_id, "Task completed")
            }
            ExecutionOutcome::Failure { reason } => {
                warn!(task = %task_id, run = %run_id, reason = %reason, "Task failed")
            }
            ExecutionOutcome::Fatal { reason } => {
                warn!(task = %task_id, run = %run_id, reason = %reason, "Task permanently failing")
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskReport;
    use async_trait::async_trait;

    enum Behavior {
        Succeed(Option<String>),
        Fail(&'static str),
        BadConfig(&'static str),
        Panic,
        Hang,
    }

    struct TestTask(Behavior);

    #[async_trait]
    impl Task for TestTask {
        fn id(&self) -> &str {
            "test"
        }

        fn label(&self) -> &str {
            "Test"
        }

        fn default_interval(&self) -> Duration {
            Duration::from_secs(3600)
        }

        async fn run(&self, _ctx: &TaskContext) -> Result<TaskReport, TaskError> {
            match &self.0 {
                Behavior::Succeed(detail) => Ok(TaskReport {
                    detail: detail.clone(),
                }),
                Behavior::Fail(reason) => Err(TaskError::Failed(reason.to_string())),
                Behavior::BadConfig(reason) => {
                    Err(TaskError::ConfigurationInvalid(reason.to_string()))
                }
                Behavior::Panic => panic!("boom"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(TaskReport::empty())
                }
            }
        }
    }

    async fn run(behavior: Behavior, timeout: Duration) -> ExecutionOutcome {
        let runner = TaskRunner::new(timeout);
        runner
            .execute(
                Arc::new(TestTask(behavior)),
                std::env::temp_dir(),
                Utc::now(),
            )
            .await
    }

    #[tokio::test]
    async fn test_success_carries_detail() {
        let outcome = run(
            Behavior::Succeed(Some("archived 3 files".into())),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Success {
                detail: Some("archived 3 files".into())
            }
        );
        assert!(outcome.to_outcome().is_success());
    }

    #[tokio::test]
    async fn test_failure_is_captured() {
        let outcome = run(Behavior::Fail("disk full"), Duration::from_secs(5)).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failure {
                reason: "disk full".into()
            }
        );
        assert!(!outcome.is_fatal());
    }

    #[tokio::test]
    async fn test_bad_config_is_fatal() {
        let outcome = run(Behavior::BadConfig("no sources"), Duration::from_secs(5)).await;
        assert!(outcome.is_fatal());
        match outcome.to_outcome() {
            TaskOutcome::Failure { reason } => assert!(reason.contains("no sources")),
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let outcome = run(Behavior::Panic, Duration::from_secs(5)).await;
        match outcome {
            ExecutionOutcome::Failure { reason } => assert!(reason.contains("panicked")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_reason() {
        let outcome = run(Behavior::Hang, Duration::from_millis(50)).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Failure {
                reason: "timeout".into()
            }
        );
    }
}
