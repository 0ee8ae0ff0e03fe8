//! Schedule management commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use warden_config::WardenConfig;
use warden_sched::{TaskRegistry, TaskRunner};
use warden_store::ScheduleStore;
use warden_types::{LastResult, ScheduleEntry, TaskOutcome};

/// Open the schedule store under the configured data directory.
pub fn open_store(config: &WardenConfig) -> anyhow::Result<(Arc<ScheduleStore>, PathBuf)> {
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let store = ScheduleStore::open(&data_dir.join("warden.db"))?;
    Ok((Arc::new(store), data_dir))
}

/// Build the task registry from the built-in task set.
pub fn registry(config: &WardenConfig) -> anyhow::Result<Arc<TaskRegistry>> {
    let registry = TaskRegistry::from_tasks(warden_tasks::builtin_tasks(config))?;
    Ok(Arc::new(registry))
}

fn describe_result(entry: &ScheduleEntry) -> String {
    match &entry.last_result {
        None => "never run".to_string(),
        Some(LastResult {
            outcome: TaskOutcome::Success { detail },
            finished_at,
        }) => match detail {
            Some(detail) => format!("ok at {} ({detail})", finished_at.to_rfc3339()),
            None => format!("ok at {}", finished_at.to_rfc3339()),
        },
        Some(LastResult {
            outcome: TaskOutcome::Failure { reason },
            finished_at,
        }) => format!("failed at {} ({reason})", finished_at.to_rfc3339()),
    }
}

pub async fn status(config: WardenConfig, json: bool) -> anyhow::Result<()> {
    let (store, _) = open_store(&config)?;
    let registry = registry(&config)?;
    let entries = store.list().await?;

    if json {
        let mut rows = Vec::new();
        for id in registry.ids() {
            let label = registry.get(id).map(|t| t.label().to_string());
            let entry = entries.iter().find(|e| e.task_id == id);
            rows.push(serde_json::json!({
                "task_id": id,
                "label": label,
                "entry": entry,
            }));
        }
        for entry in entries.iter().filter(|e| registry.get(&e.task_id).is_none()) {
            rows.push(serde_json::json!({
                "task_id": entry.task_id,
                "label": serde_json::Value::Null,
                "entry": entry,
            }));
        }
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for id in registry.ids() {
        let label = registry
            .get(id)
            .map(|t| t.label().to_string())
            .unwrap_or_default();
        match entries.iter().find(|e| e.task_id == id) {
            None => println!("{id:<18} {label:<16} not scheduled"),
            Some(entry) => {
                let state = if entry.enabled { "enabled" } else { "disabled" };
                println!(
                    "{id:<18} {label:<16} {state:<9} every {}s, next {}, last: {}",
                    entry.interval_seconds,
                    entry.next_run_at.to_rfc3339(),
                    describe_result(entry),
                );
            }
        }
    }
    for entry in entries.iter().filter(|e| registry.get(&e.task_id).is_none()) {
        println!("{:<18} (no registered task)", entry.task_id);
    }
    Ok(())
}

pub async fn enable(config: WardenConfig, task_id: String) -> anyhow::Result<()> {
    let (store, _) = open_store(&config)?;
    let registry = registry(&config)?;
    let Some(task) = registry.get(&task_id) else {
        anyhow::bail!("unknown task: {task_id}");
    };

    let entry = match store.get(&task_id).await? {
        Some(mut entry) => {
            entry.enabled = true;
            entry
        }
        None => ScheduleEntry::new(
            &task_id,
            task.default_interval().as_secs() as i64,
            Utc::now(),
        ),
    };
    store.put(&entry).await?;
    println!(
        "{task_id} enabled, every {}s, next run {}",
        entry.interval_seconds,
        entry.next_run_at.to_rfc3339()
    );
    Ok(())
}

pub async fn disable(config: WardenConfig, task_id: String) -> anyhow::Result<()> {
    let (store, _) = open_store(&config)?;
    let Some(mut entry) = store.get(&task_id).await? else {
        anyhow::bail!("{task_id} is not scheduled");
    };
    entry.enabled = false;
    store.put(&entry).await?;
    println!("{task_id} disabled");
    Ok(())
}

pub async fn set_interval(
    config: WardenConfig,
    task_id: String,
    seconds: u64,
) -> anyhow::Result<()> {
    if seconds == 0 {
        anyhow::bail!("interval must be positive");
    }
    let (store, _) = open_store(&config)?;
    let registry = registry(&config)?;

    let now = Utc::now();
    let entry = match store.get(&task_id).await? {
        Some(mut entry) => {
            entry.interval_seconds = seconds as i64;
            entry.next_run_at = now + chrono::Duration::seconds(seconds as i64);
            entry
        }
        None => {
            if registry.get(&task_id).is_none() {
                anyhow::bail!("unknown task: {task_id}");
            }
            ScheduleEntry::new(&task_id, seconds as i64, now)
        }
    };
    store.put(&entry).await?;
    println!(
        "{task_id} interval set to {seconds}s, next run {}",
        entry.next_run_at.to_rfc3339()
    );
    Ok(())
}

pub async fn remove(config: WardenConfig, task_id: String) -> anyhow::Result<()> {
    let (store, _) = open_store(&config)?;
    if store.delete(&task_id).await? {
        println!("{task_id} removed");
    } else {
        println!("{task_id} was not scheduled");
    }
    Ok(())
}

/// Execute a task immediately and record the result on its entry, if one
/// exists. The regular schedule is left untouched.
pub async fn run_task(config: WardenConfig, task_id: String) -> anyhow::Result<()> {
    let (store, data_dir) = open_store(&config)?;
    let registry = registry(&config)?;
    let Some(task) = registry.get(&task_id) else {
        anyhow::bail!("unknown task: {task_id}");
    };

    let runner = TaskRunner::new(Duration::from_secs(config.scheduler.task_timeout_seconds));
    let outcome = runner.execute(task, data_dir, Utc::now()).await;
    let task_outcome = outcome.to_outcome();

    if let Some(mut entry) = store.get(&task_id).await? {
        entry.last_result = Some(LastResult {
            outcome: task_outcome.clone(),
            finished_at: Utc::now(),
        });
        if outcome.is_fatal() {
            entry.enabled = false;
        }
        store.put(&entry).await?;
    }

    match task_outcome {
        TaskOutcome::Success { detail } => {
            println!("{task_id}: ok{}", detail.map(|d| format!(" ({d})")).unwrap_or_default())
        }
        TaskOutcome::Failure { reason } => println!("{task_id}: failed ({reason})"),
    }
    Ok(())
}
