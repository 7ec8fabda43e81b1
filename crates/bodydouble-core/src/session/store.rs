//! Session accessors.
//!
//! No lock is held across a read-modify-write. The orchestrator and the
//! meeting monitor both work at second-or-coarser granularity and a lost
//! update costs at most one tick, so last-writer-wins is accepted.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::storage::{load_yaml, save_yaml};

use super::Session;

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session>;

    fn save(&self, session: &Session) -> Result<()>;

    /// Whole-document read-modify-write. Returns the saved document.
    fn update(&self, apply: &mut dyn FnMut(&mut Session)) -> Result<Session> {
        let mut session = self.load()?;
        apply(&mut session);
        self.save(&session)?;
        Ok(session)
    }
}

/// YAML file store. Every save is mirrored into the process environment.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session> {
        load_yaml(&self.path)
    }

    fn save(&self, session: &Session) -> Result<()> {
        save_yaml(&self.path, session)?;
        export_environment(session);
        Ok(())
    }
}

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Session>,
}

impl MemorySessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session> {
        Ok(self.snapshot())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = session.clone();
        Ok(())
    }
}

/// Variables mirrored into the environment after each file save.
pub fn environment_projection(session: &Session) -> Vec<(&'static str, String)> {
    vec![
        (
            "POMODORO_WORK_SESSIONS",
            session.work_sessions_completed.to_string(),
        ),
        (
            "POMODORO_FUN_SESSIONS",
            session.fun_sessions_completed.to_string(),
        ),
        (
            "POMODORO_CURRENT_TASK",
            session.current_task.clone().unwrap_or_default(),
        ),
        (
            "POMODORO_TASK_TYPE",
            session
                .current_task_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        ),
        (
            "POMODORO_START_TIME",
            session.start_time.clone().unwrap_or_default(),
        ),
    ]
}

/// One-way export for shell tooling running next to the orchestrator.
pub fn export_environment(session: &Session) {
    for (name, value) in environment_projection(session) {
        std::env::set_var(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskType;

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.yaml"));

        let mut session = Session::default();
        session.set_task("Writing", TaskType::Work);
        session.work_sessions_completed = 3;
        store.save(&session).unwrap();

        assert_eq!(store.load().unwrap(), session);
    }

    #[test]
    fn projection_mirrors_counters_and_task() {
        let mut session = Session::default();
        session.set_task("Writing", TaskType::Work);
        session.work_sessions_completed = 3;

        let vars = environment_projection(&session);
        let get = |name: &str| {
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("POMODORO_WORK_SESSIONS"), "3");
        assert_eq!(get("POMODORO_TASK_TYPE"), "work");
        assert_eq!(get("POMODORO_CURRENT_TASK"), "Writing");
        assert_eq!(get("POMODORO_START_TIME"), "");
    }

    #[test]
    fn update_is_read_modify_write() {
        let store = MemorySessionStore::default();
        let saved = store
            .update(&mut |s| s.timer_override_minutes = Some(0.0))
            .unwrap();
        assert_eq!(saved.timer_override_minutes, Some(0.0));
        assert_eq!(store.snapshot().timer_override_minutes, Some(0.0));
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.yaml"));
        assert_eq!(store.load().unwrap(), Session::default());
    }
}
