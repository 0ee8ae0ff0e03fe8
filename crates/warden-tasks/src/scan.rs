//! Signature scan — matches file contents against known-bad patterns.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use warden_config::ScanSettings;
use warden_sched::{Task, TaskContext, TaskError, TaskReport};

use crate::walk::walk_files;

pub const SCAN_TASK_ID: &str = "scan";

/// Built-in signature set, used when no patterns are configured.
static DEFAULT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"eval\s*\(\s*base64_decode\s*\(",
        r"(?i)c99shell",
        r"(?i)r57shell",
        r"(?i)FilesMan",
        r"gzinflate\s*\(\s*base64_decode\s*\(",
        r"preg_replace\s*\(\s*['\x22]/\.\*/e",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("built-in signature compiles"))
    .collect()
});

/// Walks the configured roots and matches file contents against the
/// signature list, skipping files over the size cap.
pub struct ScanTask {
    roots: Vec<PathBuf>,
    signatures: Vec<String>,
    max_file_bytes: u64,
}

impl ScanTask {
    pub fn new(settings: &ScanSettings) -> Self {
        Self {
            roots: settings.roots.clone(),
            signatures: settings.signatures.clone(),
            max_file_bytes: settings.max_file_bytes,
        }
    }

    fn patterns(&self) -> Result<Vec<Regex>, TaskError> {
        if self.signatures.is_empty() {
            return Ok(DEFAULT_PATTERNS.clone());
        }
        self.signatures
            .iter()
            .map(|s| {
                Regex::new(s).map_err(|e| {
                    TaskError::ConfigurationInvalid(format!("bad signature pattern '{s}': {e}"))
                })
            })
            .collect()
    }
}

#[async_trait]
impl Task for ScanTask {
    fn id(&self) -> &str {
        SCAN_TASK_ID
    }

    fn label(&self) -> &str {
        "Security Scan"
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(86400)
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        if self.roots.is_empty() {
            return Err(TaskError::ConfigurationInvalid(
                "scan.roots is empty".to_string(),
            ));
        }
        for root in &self.roots {
            if !root.is_dir() {
                return Err(TaskError::ConfigurationInvalid(format!(
                    "scan root {} is not a directory",
                    root.display()
                )));
            }
        }
        let patterns = self.patterns()?;

        let mut scanned = 0u64;
        let mut suspicious = 0u64;
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
                let bytes = match fs::read(&file) {
                    Ok(bytes) => bytes,
                    // Files can vanish between the walk and the read
                    Err(e) => {
                        warn!(file = %file.display(), "Could not read file: {e}");
                        continue;
                    }
                };
                scanned += 1;
                let content = String::from_utf8_lossy(&bytes);
                for pattern in &patterns {
                    if pattern.is_match(&content) {
                        warn!(
                            file = %file.display(),
                            pattern = %pattern.as_str(),
                            "Signature match"
                        );
                        suspicious += 1;
                        break;
                    }
                }
            }
        }

        info!(scanned, suspicious, "Scan finished");
        let detail = if suspicious == 0 {
            format!("no matches in {scanned} files")
        } else {
            format!("{suspicious} suspicious files of {scanned} scanned")
        };
        Ok(TaskReport::with_detail(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    fn context(data_dir: &Path) -> TaskContext {
        TaskContext {
            started_at: Utc::now(),
            data_dir: data_dir.to_path_buf(),
            cancel: CancellationToken::new(),
        }
    }

    fn task_for(root: &Path, signatures: Vec<String>) -> ScanTask {
        ScanTask::new(&ScanSettings {
            roots: vec![root.to_path_buf()],
            signatures,
            max_file_bytes: 10 * 1024 * 1024,
        })
    }

    #[tokio::test]
    async fn test_clean_tree() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("index.php"), "<?php echo 'hi';").unwrap();

        let task = task_for(root.path(), vec![]);
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(report.detail.as_deref(), Some("no matches in 1 files"));
    }

    #[tokio::test]
    async fn test_default_signatures_match() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("bad.php"),
            "<?php eval(base64_decode($_POST['x']));",
        )
        .unwrap();
        fs::write(root.path().join("ok.txt"), "nothing here").unwrap();

        let task = task_for(root.path(), vec![]);
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("1 suspicious files of 2 scanned")
        );
    }

    #[tokio::test]
    async fn test_configured_signatures_override_defaults() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("note.txt"), "DROP TABLE users").unwrap();

        let task = task_for(root.path(), vec![r"DROP\s+TABLE".to_string()]);
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(
            report.detail.as_deref(),
            Some("1 suspicious files of 1 scanned")
        );
    }

    #[tokio::test]
    async fn test_invalid_signature_is_configuration_invalid() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "x").unwrap();

        let task = task_for(root.path(), vec!["([unclosed".to_string()]);
        let err = task.run(&context(data.path())).await.unwrap_err();
        assert!(matches!(err, TaskError::ConfigurationInvalid(_)));
    }

    #[tokio::test]
    async fn test_oversized_files_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(root.path().join("big.php"), "eval(base64_decode(x)".repeat(100)).unwrap();

        let task = ScanTask::new(&ScanSettings {
            roots: vec![root.path().to_path_buf()],
            signatures: vec![],
            max_file_bytes: 10,
        });
        let report = task.run(&context(data.path())).await.unwrap();
        assert_eq!(report.detail.as_deref(), Some("no matches in 0 files"));
    }

    #[tokio::test]
    async fn test_empty_roots_is_configuration_invalid() {
        let data = tempfile::tempdir().unwrap();
        let task = ScanTask::new(&ScanSettings::default());
        let err = task.run(&context(data.path())).await.unwrap_err();
        assert!(matches!(err, TaskError::ConfigurationInvalid(_)));
    }
}
