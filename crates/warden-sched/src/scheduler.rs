//! The scheduler — evaluates due entries on each tick and dispatches them.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use warden_store::{ScheduleStore, StoreError};
use warden_types::{LastResult, TaskOutcome};

use crate::{TaskRegistry, TaskRunner};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The store was unavailable; the tick was aborted without advancing
    /// any remaining entry. A later tick retries from persisted state.
    #[error("schedule store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// One executed entry within a tick.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub task_id: String,
    pub outcome: TaskOutcome,
    /// True when the outcome was fatal and the entry was disabled.
    pub disabled: bool,
}

/// What a single tick did.
#[derive(Debug, Default, Serialize)]
pub struct TickReport {
    /// Entries executed this tick, in execution order.
    pub executed: Vec<ExecutionRecord>,
    /// True when another tick was still in progress and this one did nothing.
    pub overlapped: bool,
}

/// Coordinates due-entry selection, execution, and rescheduling.
pub struct Scheduler {
    store: Arc<ScheduleStore>,
    registry: Arc<TaskRegistry>,
    runner: TaskRunner,
    data_dir: PathBuf,
    tick_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        store: Arc<ScheduleStore>,
        registry: Arc<TaskRegistry>,
        runner: TaskRunner,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            registry,
            runner,
            data_dir,
            tick_lock: Mutex::new(()),
        }
    }

    /// Evaluate and run every due entry as of `now`.
    ///
    /// Overlapping invocations are rejected by an advisory lock held for the
    /// duration of the tick and released unconditionally on exit: the second
    /// caller gets an `overlapped` report and no task runs twice. Entries run
    /// sequentially; each updated entry is persisted before the next one
    /// starts, so a crash mid-tick cannot replay a completed run.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, SchedulerError> {
        let _guard = match self.tick_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Tick already in progress, skipping");
                return Ok(TickReport {
                    overlapped: true,
                    ..Default::default()
                });
            }
        };

        let mut report = TickReport::default();
        let entries = self.store.list().await?;

        for mut entry in entries {
            if !entry.is_due(now) {
                continue;
            }
            let Some(task) = self.registry.get(&entry.task_id) else {
                warn!(task = %entry.task_id, "No registered task for schedule entry, skipping");
                continue;
            };

            let outcome = self
                .runner
                .execute(task, self.data_dir.clone(), now)
                .await;
            let finished_at = Utc::now();
            let task_outcome = outcome.to_outcome();

            // Fixed delay: the next run is measured from completion, so a
            // slow run pushes the following one out instead of producing a
            // catch-up burst.
            entry.next_run_at = finished_at + chrono::Duration::seconds(entry.interval_seconds);
            entry.last_result = Some(LastResult {
                outcome: task_outcome.clone(),
                finished_at,
            });
            let disabled = outcome.is_fatal();
            if disabled {
                entry.enabled = false;
                warn!(task = %entry.task_id, "Entry disabled until an administrator re-enables it");
            }

            self.store.put(&entry).await?;
            report.executed.push(ExecutionRecord {
                task_id: entry.task_id,
                outcome: task_outcome,
                disabled,
            });
        }

        Ok(report)
    }

    /// Drive ticks on a fixed period until the token is cancelled.
    pub async fn run(self: Arc<Self>, period: std::time::Duration, cancel: CancellationToken) {
        info!("Scheduler started, ticking every {}s", period.as_secs());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    return;
                }
                _ = tokio::time::sleep(period) => {}
            }
            match self.tick(Utc::now()).await {
                Ok(report) if !report.executed.is_empty() => {
                    info!(count = report.executed.len(), "Tick executed due tasks");
                }
                Ok(_) => {}
                Err(e) => warn!("Tick aborted: {e}"),
            }
        }
    }
}
