//! Backup task — snapshots the configured sources into the destination.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use warden_config::BackupSettings;
use warden_sched::{Task, TaskContext, TaskError, TaskReport};

use crate::walk::walk_files;

pub const BACKUP_TASK_ID: &str = "backup";

/// Copies the configured source directories into a timestamped snapshot
/// directory under the destination, then prunes snapshots beyond the
/// retention count.
pub struct BackupTask {
    sources: Vec<PathBuf>,
    destination: Option<PathBuf>,
    keep: usize,
}

impl BackupTask {
    pub fn new(settings: &BackupSettings) -> Self {
        Self {
            sources: settings.sources.clone(),
            destination: settings.destination.clone(),
            keep: settings.keep.max(1),
        }
    }

    fn destination(&self, data_dir: &Path) -> PathBuf {
        self.destination
            .clone()
            .unwrap_or_else(|| data_dir.join("backups"))
    }

    /// Remove the oldest snapshots beyond the retention count. Snapshot
    /// names are timestamps, so lexical order is chronological.
    fn prune(&self, destination: &Path) -> Result<(), TaskError> {
        let entries = fs::read_dir(destination)
            .map_err(|e| TaskError::Failed(format!("read backup destination: {e}")))?;
        let mut snapshots: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        snapshots.sort();

        while snapshots.len() > self.keep {
            let oldest = snapshots.remove(0);
            debug!(snapshot = %oldest.display(), "Pruning old snapshot");
            fs::remove_dir_all(&oldest)
                .map_err(|e| TaskError::Failed(format!("prune snapshot: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Task for BackupTask {
    fn id(&self) -> &str {
        BACKUP_TASK_ID
    }

    fn label(&self) -> &str {
        "Backups"
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(86400)
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        if self.sources.is_empty() {
            return Err(TaskError::ConfigurationInvalid(
                "backup.sources is empty".to_string(),
            ));
        }
        for source in &self.sources {
            if !source.is_dir() {
                return Err(TaskError::ConfigurationInvalid(format!(
                    "backup source {} is not a directory",
                    source.display()
                )));
            }
        }

        let destination = self.destination(&ctx.data_dir);
        let snapshot = destination.join(ctx.started_at.format("%Y%m%d-%H%M%S").to_string());
        fs::create_dir_all(&snapshot)
            .map_err(|e| TaskError::Failed(format!("create snapshot dir: {e}")))?;

        let mut files = 0u64;
        let mut bytes = 0u64;
        for source in &self.sources {
            let base = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("root"));
            let walked = walk_files(source)
                .map_err(|e| TaskError::Failed(format!("walk {}: {e}", source.display())))?;
            for file in walked {
                if ctx.cancel.is_cancelled() {
                    return Err(TaskError::Failed("cancelled".to_string()));
                }
                let rel = file
                    .strip_prefix(source)
                    .map_err(|e| TaskError::Failed(format!("relativize {}: {e}", file.display())))?;
                let target = snapshot.join(&base).join(rel);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| TaskError::Failed(format!("create dir: {e}")))?;
                }
                let copied = fs::copy(&file, &target)
                    .map_err(|e| TaskError::Failed(format!("copy {}: {e}", file.display())))?;
                files += 1;
                bytes += copied;
            }
        }

        self.prune(&destination)?;

        info!(files, bytes, snapshot = %snapshot.display(), "Backup snapshot written");
        Ok(TaskReport::with_detail(format!(
            "archived {files} files ({bytes} bytes)"
        )))
    }
}
