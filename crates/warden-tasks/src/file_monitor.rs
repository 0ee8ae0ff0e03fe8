//! File-integrity monitoring — hashes the watched roots and diffs the
//! result against the stored baseline.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use warden_config::FileMonitoringSettings;
use warden_sched::{Task, TaskContext, TaskError, TaskReport};

use crate::walk::walk_files;

pub const FILE_MONITORING_TASK_ID: &str = "file-monitoring";

/// Fingerprints the watched roots with SHA-256 and reports drift against
/// the previous run's baseline. The first run establishes the baseline.
pub struct FileMonitorTask {
    roots: Vec<PathBuf>,
    baseline: Option<PathBuf>,
    max_file_bytes: u64,
}

impl FileMonitorTask {
    pub fn new(settings: &FileMonitoringSettings) -> Self {
        Self {
            roots: settings.roots.clone(),
            baseline: settings.baseline.clone(),
            max_file_bytes: settings.max_file_bytes,
        }
    }

    fn baseline_path(&self, data_dir: &Path) -> PathBuf {
        self.baseline
            .clone()
            .unwrap_or_else(|| data_dir.join("baseline.json"))
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write the baseline through a temp file so a crash mid-write never
/// leaves a truncated baseline behind.
fn write_baseline(path: &Path, digests: &BTreeMap<String, String>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TaskError::Failed(format!("create baseline dir: {e}")))?;
    }
    let content = serde_json::to_string_pretty(digests)
        .map_err(|e| TaskError::Failed(format!("serialize baseline: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| TaskError::Failed(format!("write baseline: {e}")))?;
    fs::rename(&tmp, path).map_err(|e| TaskError::Failed(format!("replace baseline: {e}")))?;
    Ok(())
}

#[async_trait]
impl Task for FileMonitorTask {
    fn id(&self) -> &str {
        FILE_MONITORING_TASK_ID
    }

    fn label(&self) -> &str {
        "File Monitoring"
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(21600)
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        if self.roots.is_empty() {
            return Err(TaskError::ConfigurationInvalid(
                "file_monitoring.roots is empty".to_string(),
            ));
        }
        for root in &self.roots {
            if !root.is_dir() {
                return Err(TaskError::ConfigurationInvalid(format!(
                    "monitored root {} is not a directory",
                    root.display()
                )));
            }
        }

        let mut current: BTreeMap<String, String> = BTreeMap::new();
        for root in &self.roots {
            let walked = walk_files(root)
                .map_err(|e| TaskError::Failed(format!("walk {}: {e}", root.display())))?;
            for file in walked {
                if ctx.cancel.is_cancelled() {
                    return Err(TaskError::Failed("cancelled".to_string()));
                }
                let len = fs::metadata(&file).map(|m| m.len()).unwrap_or(0);
                if len > self.max_file_bytes {
                    continue;
                }
                match hash_file(&file) {
                    Ok(digest) => {
                        current.insert(file.display().to_string(), digest);
                    }
                    // Files can vanish between the walk and the hash
                    Err(e) => warn!(file = %file.display(), "Could not hash file: {e}"),
                }
            }
        }

        let baseline_path = self.baseline_path(&ctx.data_dir);
        let previous: Option<BTreeMap<String, String>> =
            match fs::read_to_string(&baseline_path) {
                Ok(content) => Some(serde_json::from_str(&content).map_err(|e| {
                    TaskError::Failed(format!("baseline is corrupt: {e}"))
                })?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(TaskError::Failed(format!("read baseline: {e}"))),
            };

        write_baseline(&baseline_path, &current)?;

        let Some(previous) = previous else {
            info!(files = current.len(), "File-integrity baseline established");
            return Ok(TaskReport::with_detail(format!(
                "baseline established ({} files)",
                current.len()
            )));
        };

        let added = current
            .keys()
            .filter(|k| !previous.contains_key(*k))
            .count();
        let removed = previous
            .keys()
            .filter(|k| !current.contains_key(*k))
            .count();
        let changed = current
            .iter()
            .filter(|(k, v)| previous.get(*k).is_some_and(|old| old != *v))
            .count();

        if added + removed + changed > 0 {
            warn!(added, removed, changed, "File-integrity drift detected");
        }
        Ok(TaskReport::with_detail(format!(
            "{added} added, {removed} removed, {changed} changed ({} files tracked)",
            current.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_util::sync::CancellationToken;

    fn context(data_dir: &Path) -> TaskContext {
        TaskContext {
            started_at: Utc::now(),
            data_dir: data_dir.to_path_buf(),
            cancel: CancellationToken::new(),
        }
    }

    fn task_for(root: &Path) -> FileMonitorTask {
        FileMonitorTask::new(&FileMonitoringSettings {
            roots: vec![root.to_path_buf()],
            baseline: None,
            max_file_bytes: 64 * 1024 * 1024,
        })
    }

    #[tokio::test]
    async fn test_first_run_establishes_baseline() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "one").unwrap();
        fs::write(root.path().join("b.txt"), "two").unwrap();

        let task = task_for(root.path());
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("baseline established (2 files)")
        );
        assert!(data.path().join("baseline.json").exists());
    }

    #[tokio::test]
    async fn test_drift_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "one").unwrap();
        fs::write(root.path().join("b.txt"), "two").unwrap();

        let task = task_for(root.path());
        task.run(&context(data.path())).await.unwrap();

        fs::write(root.path().join("a.txt"), "changed").unwrap();
        fs::remove_file(root.path().join("b.txt")).unwrap();
        fs::write(root.path().join("c.txt"), "new").unwrap();

        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("1 added, 1 removed, 1 changed (2 files tracked)")
        );
    }

    #[tokio::test]
    async fn test_unchanged_tree_reports_no_drift() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "one").unwrap();

        let task = task_for(root.path());
        task.run(&context(data.path())).await.unwrap();
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("0 added, 0 removed, 0 changed (1 files tracked)")
        );
    }

    #[tokio::test]
    async fn test_oversized_files_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("small.txt"), "ok").unwrap();
        fs::write(root.path().join("big.bin"), vec![0u8; 1024]).unwrap();

        let task = FileMonitorTask::new(&FileMonitoringSettings {
            roots: vec![root.path().to_path_buf()],
            baseline: None,
            max_file_bytes: 100,
        });
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("baseline established (1 files)")
        );
    }

    #[tokio::test]
    async fn test_empty_roots_is_configuration_invalid() {
        let data = tempfile::tempdir().unwrap();
        let task = FileMonitorTask::new(&FileMonitoringSettings::default());
        let err = task.run(&context(data.path())).await.unwrap_err();
        assert!(matches!(err, TaskError::ConfigurationInvalid(_)));
    }

    #[tokio::test]
    async fn test_corrupt_baseline_is_failure() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "one").unwrap();
        fs::write(data.path().join("baseline.json"), "{not json").unwrap();

        let task = task_for(root.path());
        let err = task.run(&context(data.path())).await.unwrap_err();
        assert!(matches!(err, TaskError::Failed(reason) if reason.contains("corrupt")));
    }
}
