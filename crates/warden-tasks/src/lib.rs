//! warden-tasks: the built-in security task implementations.
//!
//! Each task implements [`warden_sched::Task`] and is assembled into the
//! registry at startup via [`builtin_tasks`].

mod walk;

pub mod backup;
pub mod file_monitor;
pub mod scan;

pub use backup::BackupTask;
pub use file_monitor::FileMonitorTask;
pub use scan::ScanTask;

use std::sync::Arc;

use warden_config::WardenConfig;
use warden_sched::Task;

/// Assemble the built-in task set from configuration.
pub fn builtin_tasks(config: &WardenConfig) -> Vec<Arc<dyn Task>> {
    vec![
        Arc::new(BackupTask::new(&config.backup)),
        Arc::new(FileMonitorTask::new(&config.file_monitoring)),
        Arc::new(ScanTask::new(&config.scan)),
    ]
}
