//! Settings schema consumed by the administrator-facing rendering layer.
//!
//! The scheduler core never depends on this; it exists so an external UI
//! can enumerate and validate the editable settings without hardcoding them.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),
    #[error("'{0}' is not a whole number")]
    NotANumber(String),
    #[error("value must be at least {min}")]
    BelowMinimum { min: u64 },
}

/// Field type plus constraints, as rendered by the external layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingKind {
    Text,
    Url,
    Seconds { min: u64 },
    Count { min: u64 },
}

/// One editable setting.
#[derive(Debug, Clone, Serialize)]
pub struct SettingField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: SettingKind,
    pub help: &'static str,
}

impl SettingField {
    /// Validate a raw string value against this field's kind.
    pub fn validate(&self, raw: &str) -> Result<(), ValidationError> {
        match &self.kind {
            SettingKind::Text => Ok(()),
            SettingKind::Url => {
                url::Url::parse(raw)
                    .map(|_| ())
                    .map_err(|_| ValidationError::InvalidUrl(raw.to_string()))
            }
            SettingKind::Seconds { min } | SettingKind::Count { min } => {
                let value: u64 = raw
                    .parse()
                    .map_err(|_| ValidationError::NotANumber(raw.to_string()))?;
                if value < *min {
                    return Err(ValidationError::BelowMinimum { min: *min });
                }
                Ok(())
            }
        }
    }
}

/// The full list of editable settings.
pub fn settings_schema() -> Vec<SettingField> {
    vec![
        SettingField {
            key: "scheduler.tick_seconds",
            label: "Tick interval",
            kind: SettingKind::Seconds { min: 10 },
            help: "Seconds between scheduler passes over the due entries.",
        },
        SettingField {
            key: "scheduler.task_timeout_seconds",
            label: "Task timeout",
            kind: SettingKind::Seconds { min: 1 },
            help: "A task running longer than this is recorded as failed.",
        },
        SettingField {
            key: "backup.keep",
            label: "Snapshots to keep",
            kind: SettingKind::Count { min: 1 },
            help: "Older backup snapshots beyond this count are pruned.",
        },
        SettingField {
            key: "white_label.display_name",
            label: "Plugin name",
            kind: SettingKind::Text,
            help: "Product name shown in the administrator interface.",
        },
        SettingField {
            key: "white_label.url",
            label: "Plugin URL",
            kind: SettingKind::Url,
            help: "Link attached to the product name.",
        },
        SettingField {
            key: "white_label.description",
            label: "Description",
            kind: SettingKind::Text,
            help: "Short product description.",
        },
        SettingField {
            key: "white_label.author",
            label: "Author",
            kind: SettingKind::Text,
            help: "Author name shown in the administrator interface.",
        },
        SettingField {
            key: "white_label.author_url",
            label: "Author URL",
            kind: SettingKind::Url,
            help: "Link attached to the author name.",
        },
    ]
}

/// Look up a field by key.
pub fn field(key: &str) -> Option<SettingField> {
    settings_schema().into_iter().find(|f| f.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_keys_unique() {
        let schema = settings_schema();
        let mut keys: Vec<_> = schema.iter().map(|f| f.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), schema.len());
    }

    #[test]
    fn test_validate_url() {
        let f = field("white_label.url").unwrap();
        assert!(f.validate("https://example.com/product").is_ok());
        assert_eq!(
            f.validate("not a url"),
            Err(ValidationError::InvalidUrl("not a url".into()))
        );
    }

    #[test]
    fn test_validate_seconds_minimum() {
        let f = field("scheduler.tick_seconds").unwrap();
        assert!(f.validate("60").is_ok());
        assert_eq!(
            f.validate("5"),
            Err(ValidationError::BelowMinimum { min: 10 })
        );
        assert_eq!(
            f.validate("sixty"),
            Err(ValidationError::NotANumber("sixty".into()))
        );
    }

    #[test]
    fn test_text_accepts_anything() {
        let f = field("white_label.display_name").unwrap();
        assert!(f.validate("Acme Shield").is_ok());
        assert!(f.validate("").is_ok());
    }

    #[test]
    fn test_unknown_key() {
        assert!(field("no.such.key").is_none());
    }
}
