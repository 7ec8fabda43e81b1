//! Permanent work log (`log.yaml`).
//!
//! The session-scoped `session_log` accumulator is merged in here exactly
//! once, when a session ends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::TaskStats;
use crate::storage::{load_yaml, save_yaml};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    pub sessions: u32,
    pub minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkLog {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectRecord>,
}

impl WorkLog {
    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Add a zeroed project record if absent.
    pub fn ensure_project(&mut self, name: &str) {
        self.projects.entry(name.to_string()).or_default();
    }

    /// Fold a session's per-task accumulator into the permanent record.
    pub fn merge_session(&mut self, session_log: &BTreeMap<String, TaskStats>, day: NaiveDate) {
        let date = day.format("%Y-%m-%d").to_string();
        for (name, stats) in session_log {
            let project = self.projects.entry(name.clone()).or_default();
            project.total_sessions += stats.sessions;
            project.total_hours += stats.hours;

            let minutes = stats.hours * 60.0;
            match project.history.iter_mut().find(|e| e.date == date) {
                Some(entry) => {
                    entry.sessions += stats.sessions;
                    entry.minutes += minutes;
                }
                None => project.history.push(HistoryEntry {
                    date: date.clone(),
                    sessions: stats.sessions,
                    minutes,
                }),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkLogStore {
    path: PathBuf,
}

impl WorkLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<WorkLog> {
        load_yaml(&self.path)
    }

    pub fn save(&self, log: &WorkLog) -> Result<()> {
        save_yaml(&self.path, log)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.load()?.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn stats(hours: f64, sessions: u32) -> TaskStats {
        TaskStats { hours, sessions }
    }

    #[test]
    fn merge_creates_and_extends_today_entry() {
        let mut log = WorkLog::default();
        let mut acc = BTreeMap::new();
        acc.insert("Writing".to_string(), stats(0.5, 1));

        log.merge_session(&acc, day(2));
        log.merge_session(&acc, day(2));

        let project = &log.projects["Writing"];
        assert_eq!(project.total_sessions, 2);
        assert!((project.total_hours - 1.0).abs() < 1e-9);
        assert_eq!(project.history.len(), 1);
        assert_eq!(project.history[0].sessions, 2);
        assert!((project.history[0].minutes - 60.0).abs() < 1e-9);
    }

    #[test]
    fn merge_on_new_day_appends_history() {
        let mut log = WorkLog::default();
        log.ensure_project("Guitar");
        let mut acc = BTreeMap::new();
        acc.insert("Guitar".to_string(), stats(0.25, 1));

        log.merge_session(&acc, day(2));
        log.merge_session(&acc, day(3));

        let history = &log.projects["Guitar"].history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].date, "2026-03-03");
    }

    #[test]
    fn store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkLogStore::new(dir.path().join("log.yaml"));
        let mut log = WorkLog::default();
        log.ensure_project("Writing");
        store.save(&log).unwrap();
        assert!(store.contains("Writing").unwrap());
        assert!(!store.contains("Guitar").unwrap());
    }
}
