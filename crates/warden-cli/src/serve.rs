//! The `run` command — drives the scheduler loop until interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_config::WardenConfig;
use warden_sched::{Scheduler, TaskRunner};

use crate::schedule;

pub async fn run(config: WardenConfig) -> anyhow::Result<()> {
    let (store, data_dir) = schedule::open_store(&config)?;
    let registry = schedule::registry(&config)?;
    info!(tasks = registry.len(), "Task registry built");

    let runner = TaskRunner::new(Duration::from_secs(config.scheduler.task_timeout_seconds));
    let scheduler = Arc::new(Scheduler::new(store, registry, runner, data_dir));

    // Catch up on anything overdue before settling into the tick cadence.
    if let Err(e) = scheduler.tick(Utc::now()).await {
        warn!("Startup tick failed: {e}");
    }

    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(
        scheduler
            .clone()
            .run(Duration::from_secs(config.scheduler.tick_seconds), cancel.clone()),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();
    loop_handle.await?;
    Ok(())
}
