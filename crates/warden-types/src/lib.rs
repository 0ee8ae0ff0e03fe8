use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────── Schedule Types ────────────────────

/// Outcome of a single task execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Failure {
        reason: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }
}

/// Result of the most recent execution of a scheduled task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastResult {
    pub outcome: TaskOutcome,
    /// Completion time of the run.
    pub finished_at: DateTime<Utc>,
}

/// A persisted binding of a task type to a concrete recurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Task identifier (e.g. "backup", "file-monitoring", "scan").
    pub task_id: String,
    /// Recurrence interval in seconds. Always positive.
    pub interval_seconds: i64,
    /// Absolute time of the next run.
    pub next_run_at: DateTime<Utc>,
    /// Whether this entry participates in scheduling.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Outcome of the most recent run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<LastResult>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Create a new enabled entry whose first run is one interval out.
    pub fn new(task_id: impl Into<String>, interval_seconds: i64, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            interval_seconds,
            next_run_at: now + Duration::seconds(interval_seconds),
            enabled: true,
            last_result: None,
            created_at: now,
        }
    }

    /// Whether this entry should run as of `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run_at <= now
    }
}

// ──────────────────── Branding Types ────────────────────

/// White-label branding fields shown by the administrator-facing layer.
/// Purely cosmetic key/value settings; the scheduler never reads them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhiteLabelSettings {
    /// Product display name.
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Product URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Short product description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Author URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
}

impl Default for WhiteLabelSettings {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            url: None,
            description: None,
            author: None,
            author_url: None,
        }
    }
}

fn default_display_name() -> String {
    "Warden".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_entry_new() {
        let now = Utc::now();
        let entry = ScheduleEntry::new("backup", 86400, now);
        assert_eq!(entry.task_id, "backup");
        assert_eq!(entry.interval_seconds, 86400);
        assert_eq!(entry.next_run_at, now + Duration::seconds(86400));
        assert!(entry.enabled);
        assert!(entry.last_result.is_none());
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut entry = ScheduleEntry::new("scan", 60, now);
        assert!(!entry.is_due(now));
        assert!(entry.is_due(now + Duration::seconds(61)));

        entry.enabled = false;
        assert!(!entry.is_due(now + Duration::seconds(61)));
    }

    #[test]
    fn test_task_outcome_serde() {
        let ok = TaskOutcome::Success {
            detail: Some("archived 12 files".into()),
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"status\":\"success\""));

        let err = TaskOutcome::Failure {
            reason: "timeout".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let parsed: TaskOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_schedule_entry_serde() {
        let now = Utc::now();
        let mut entry = ScheduleEntry::new("file-monitoring", 21600, now);
        entry.last_result = Some(LastResult {
            outcome: TaskOutcome::Success { detail: None },
            finished_at: now,
        });
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: ScheduleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.task_id, "file-monitoring");
        assert_eq!(parsed.interval_seconds, 21600);
        assert!(parsed.last_result.unwrap().outcome.is_success());
    }

    #[test]
    fn test_schedule_entry_enabled_defaults_true() {
        let json = r#"{"task_id":"backup","interval_seconds":60,
            "next_run_at":"2026-01-01T00:00:00Z","created_at":"2026-01-01T00:00:00Z"}"#;
        let parsed: ScheduleEntry = serde_json::from_str(json).unwrap();
        assert!(parsed.enabled);
    }

    #[test]
    fn test_white_label_defaults() {
        let settings: WhiteLabelSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.display_name, "Warden");
        assert!(settings.url.is_none());
    }
}
