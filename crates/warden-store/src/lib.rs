//! warden-store: SQLite-based persistence for schedule state.
//!
//! One row per task identifier in `schedule_entries`, plus a `settings`
//! key/value table for the white-label branding fields. All writes touching
//! a single entry go through one statement, so readers never observe a
//! partially updated row.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use warden_types::{LastResult, ScheduleEntry, TaskOutcome, WhiteLabelSettings};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS schedule_entries (
        task_id TEXT PRIMARY KEY,
        interval_seconds INTEGER NOT NULL,
        next_run_at TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        last_status TEXT,
        last_detail TEXT,
        last_finished_at TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );";

/// Durable storage for schedule entries and branding settings.
pub struct ScheduleStore {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleStore {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Schedule store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ─── Schedule Entries ───────────────────────────────────

    /// Get the entry for a task identifier. Unknown identifiers are absence.
    pub async fn get(&self, task_id: &str) -> Result<Option<ScheduleEntry>> {
        let conn = self.conn.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT task_id, interval_seconds, next_run_at, enabled, last_status, last_detail, last_finished_at, created_at
                 FROM schedule_entries WHERE task_id = ?1",
            )?;
            let result = stmt
                .query_row(rusqlite::params![task_id], row_to_entry)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    /// Insert or replace the entry for its task identifier.
    pub async fn put(&self, entry: &ScheduleEntry) -> Result<()> {
        let conn = self.conn.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || {
            let (last_status, last_detail, last_finished_at) = match &entry.last_result {
                Some(LastResult {
                    outcome: TaskOutcome::Success { detail },
                    finished_at,
                }) => (
                    Some("success"),
                    detail.clone(),
                    Some(finished_at.to_rfc3339()),
                ),
                Some(LastResult {
                    outcome: TaskOutcome::Failure { reason },
                    finished_at,
                }) => (
                    Some("failure"),
                    Some(reason.clone()),
                    Some(finished_at.to_rfc3339()),
                ),
                None => (None, None, None),
            };

            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO schedule_entries
                    (task_id, interval_seconds, next_run_at, enabled, last_status, last_detail, last_finished_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    entry.task_id,
                    entry.interval_seconds,
                    entry.next_run_at.to_rfc3339(),
                    entry.enabled as i64,
                    last_status,
                    last_detail,
                    last_finished_at,
                    entry.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    /// List all entries, ordered by task identifier.
    pub async fn list(&self) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT task_id, interval_seconds, next_run_at, enabled, last_status, last_detail, last_finished_at, created_at
                 FROM schedule_entries ORDER BY task_id",
            )?;
            let rows = stmt
                .query_map([], row_to_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Delete the entry for a task identifier.
    pub async fn delete(&self, task_id: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count = conn.execute(
                "DELETE FROM schedule_entries WHERE task_id = ?1",
                rusqlite::params![task_id],
            )?;
            Ok(count > 0)
        })
        .await?
    }

    // ─── Branding Settings ───────────────────────────────────

    /// Get a raw setting value.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let result = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }

    /// Set a raw setting value.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
        .await?
    }

    /// Remove a setting.
    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM settings WHERE key = ?1",
                rusqlite::params![key],
            )?;
            Ok(())
        })
        .await?
    }

    /// Assemble the branding settings, falling back to `defaults` for keys
    /// the administrator never changed.
    pub async fn load_branding(&self, defaults: &WhiteLabelSettings) -> Result<WhiteLabelSettings> {
        let mut branding = defaults.clone();
        if let Some(name) = self.get_setting("display_name").await? {
            branding.display_name = name;
        }
        if let Some(url) = self.get_setting("url").await? {
            branding.url = Some(url);
        }
        if let Some(description) = self.get_setting("description").await? {
            branding.description = Some(description);
        }
        if let Some(author) = self.get_setting("author").await? {
            branding.author = Some(author);
        }
        if let Some(author_url) = self.get_setting("author_url").await? {
            branding.author_url = Some(author_url);
        }
        Ok(branding)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleEntry> {
    let last_status: Option<String> = row.get(4)?;
    let last_detail: Option<String> = row.get(5)?;
    let last_finished_at: Option<String> = row.get(6)?;

    let last_result = match (last_status.as_deref(), last_finished_at) {
        (Some("success"), Some(ts)) => ts.parse::<DateTime<Utc>>().ok().map(|finished_at| {
            LastResult {
                outcome: TaskOutcome::Success {
                    detail: last_detail.clone(),
                },
                finished_at,
            }
        }),
        (Some("failure"), Some(ts)) => ts.parse::<DateTime<Utc>>().ok().map(|finished_at| {
            LastResult {
                outcome: TaskOutcome::Failure {
                    reason: last_detail.clone().unwrap_or_default(),
                },
                finished_at,
            }
        }),
        _ => None,
    };

    Ok(ScheduleEntry {
        task_id: row.get(0)?,
        interval_seconds: row.get(1)?,
        next_run_at: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or_else(|_| Utc::now()),
        enabled: row.get::<_, i64>(3)? != 0,
        last_result,
        created_at: row
            .get::<_, String>(7)?
            .parse()
            .unwrap_or_else(|_| Utc::now()),
    })
}
