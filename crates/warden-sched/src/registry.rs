//! Task registry — fixed mapping from task identifiers to implementations.
//!
//! Built once at startup from an explicit list; there is no dynamic
//! discovery and no process-wide singleton.

use std::collections::HashMap;
use std::sync::Arc;

use crate::Task;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate task id: {0}")]
    DuplicateTask(String),
}

/// Immutable registry of the known task types.
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    /// Build a registry from a fixed list. Duplicate identifiers are a
    /// startup error.
    pub fn from_tasks(tasks: Vec<Arc<dyn Task>>) -> Result<Self, RegistryError> {
        let mut map: HashMap<String, Arc<dyn Task>> = HashMap::new();
        for task in tasks {
            let id = task.id().to_string();
            if map.insert(id.clone(), task).is_some() {
                return Err(RegistryError::DuplicateTask(id));
            }
        }
        Ok(Self { tasks: map })
    }

    /// Look up a task by identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(id).cloned()
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.tasks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over the registered tasks.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskContext, TaskError, TaskReport};
    use async_trait::async_trait;
    use std::time::Duration;

    struct DummyTask(&'static str);

    #[async_trait]
    impl Task for DummyTask {
        fn id(&self) -> &str {
            self.0
        }

        fn label(&self) -> &str {
            "Dummy"
        }

        fn default_interval(&self) -> Duration {
            Duration::from_secs(3600)
        }

        async fn run(&self, _ctx: &TaskContext) -> Result<TaskReport, TaskError> {
            Ok(TaskReport::empty())
        }
    }

    #[test]
    fn test_lookup() {
        let registry = TaskRegistry::from_tasks(vec![
            Arc::new(DummyTask("backup")),
            Arc::new(DummyTask("scan")),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("backup").is_some());
        assert!(registry.get("file-monitoring").is_none());
        assert_eq!(registry.ids(), vec!["backup", "scan"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = TaskRegistry::from_tasks(vec![
            Arc::new(DummyTask("backup")),
            Arc::new(DummyTask("backup")),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicateTask(id)) if id == "backup"));
    }

    #[test]
    fn test_empty() {
        let registry = TaskRegistry::from_tasks(vec![]).unwrap();
        assert!(registry.is_empty());
        assert!(registry.ids().is_empty());
    }
}
