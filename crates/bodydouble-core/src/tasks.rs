//! Task catalog (`tasks.yaml`).
//!
//! The agent owns this document; the orchestrator only reads it to resolve
//! a task name to its [`TaskType`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{load_yaml, save_yaml};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Work,
    Fun,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Work => "work",
            TaskType::Fun => "fun",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCatalog {
    #[serde(default)]
    pub work_tasks: Vec<TaskEntry>,
    #[serde(default)]
    pub fun_productive: Vec<TaskEntry>,
}

impl TaskCatalog {
    /// Work tasks win when a name appears in both collections.
    pub fn resolve(&self, name: &str) -> Option<TaskType> {
        if self.work_tasks.iter().any(|t| t.name == name) {
            Some(TaskType::Work)
        } else if self.fun_productive.iter().any(|t| t.name == name) {
            Some(TaskType::Fun)
        } else {
            None
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.work_tasks
            .iter()
            .chain(self.fun_productive.iter())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Returns false when the name already exists in either collection.
    pub fn add(&mut self, name: &str, task_type: TaskType) -> bool {
        if self.resolve(name).is_some() {
            return false;
        }
        let entry = TaskEntry {
            name: name.to_string(),
        };
        match task_type {
            TaskType::Work => self.work_tasks.push(entry),
            TaskType::Fun => self.fun_productive.push(entry),
        }
        true
    }
}

/// File handle for the task catalog. Re-read on every lookup so edits made
/// by the agent between polls are picked up.
#[derive(Debug, Clone)]
pub struct TaskCatalogStore {
    path: PathBuf,
}

impl TaskCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TaskCatalog> {
        load_yaml(&self.path)
    }

    pub fn save(&self, catalog: &TaskCatalog) -> Result<()> {
        save_yaml(&self.path, catalog)
    }

    pub fn resolve(&self, name: &str) -> Result<Option<TaskType>> {
        Ok(self.load()?.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TaskCatalog {
        TaskCatalog {
            work_tasks: vec![TaskEntry { name: "Writing".into() }],
            fun_productive: vec![TaskEntry { name: "Guitar".into() }],
        }
    }

    #[test]
    fn resolves_both_collections() {
        let c = catalog();
        assert_eq!(c.resolve("Writing"), Some(TaskType::Work));
        assert_eq!(c.resolve("Guitar"), Some(TaskType::Fun));
        assert_eq!(c.resolve("writing"), None);
    }

    #[test]
    fn add_rejects_duplicates_across_collections() {
        let mut c = catalog();
        assert!(!c.add("Guitar", TaskType::Work));
        assert!(c.add("Taxes", TaskType::Work));
        assert_eq!(c.names(), vec!["Writing", "Taxes", "Guitar"]);
    }

    #[test]
    fn store_reads_yaml_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        std::fs::write(
            &path,
            "work_tasks:\n  - name: Job hunting\nfun_productive:\n  - name: Baking\n",
        )
        .unwrap();
        let store = TaskCatalogStore::new(&path);
        assert_eq!(store.resolve("Job hunting").unwrap(), Some(TaskType::Work));
        assert_eq!(store.resolve("Baking").unwrap(), Some(TaskType::Fun));
    }
}
