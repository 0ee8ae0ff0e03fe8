pub mod schema;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_types::WhiteLabelSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Per-task execution timeout in seconds.
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_task_timeout_seconds() -> u64 {
    300
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            task_timeout_seconds: default_task_timeout_seconds(),
        }
    }
}

/// Settings for the backup task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Directories to back up.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Snapshot destination (defaults to `<data_dir>/backups`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Number of snapshots to retain.
    #[serde(default = "default_backup_keep")]
    pub keep: usize,
}

fn default_backup_keep() -> usize {
    5
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: None,
            keep: default_backup_keep(),
        }
    }
}

/// Settings for the file-integrity monitoring task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMonitoringSettings {
    /// Directories whose contents are fingerprinted.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Baseline file path (defaults to `<data_dir>/baseline.json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<PathBuf>,
    /// Files larger than this are skipped when hashing.
    #[serde(default = "default_monitor_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_monitor_max_file_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for FileMonitoringSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            baseline: None,
            max_file_bytes: default_monitor_max_file_bytes(),
        }
    }
}

/// Settings for the signature scan task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Directories to scan.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Signature patterns (regex). Empty uses the built-in set.
    #[serde(default)]
    pub signatures: Vec<String>,
    /// Files larger than this are skipped.
    #[serde(default = "default_scan_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_scan_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            signatures: Vec::new(),
            max_file_bytes: default_scan_max_file_bytes(),
        }
    }
}

/// Top-level warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Data directory override (database, backups, baseline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Scheduler knobs.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Backup task settings.
    #[serde(default)]
    pub backup: BackupSettings,
    /// File-integrity monitoring settings.
    #[serde(default)]
    pub file_monitoring: FileMonitoringSettings,
    /// Signature scan settings.
    #[serde(default)]
    pub scan: ScanSettings,
    /// White-label branding defaults.
    #[serde(default)]
    pub white_label: WhiteLabelSettings,
}

impl WardenConfig {
    /// Resolve the effective data directory.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => config_dir(),
        }
    }
}

/// Resolve the warden config directory (~/.warden/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".warden"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.warden/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<WardenConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<WardenConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(WardenConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: WardenConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to the default path.
pub fn save_config(config: &WardenConfig) -> Result<(), ConfigError> {
    let dir = ensure_config_dir()?;
    let path = dir.join("config.json5");
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
