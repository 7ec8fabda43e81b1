mod config;

pub use config::{
    AckConfig, Config, MeetingsConfig, NotificationsConfig, SessionConfig, TimerConfig,
};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Returns the productivity data directory.
///
/// Resolution order: `BODYDOUBLE_DIR`, `POMODORO_DIR`, then
/// `~/.claude/productivity`. The directory is created if missing.
pub fn data_dir() -> Result<PathBuf> {
    let dir = std::env::var_os("BODYDOUBLE_DIR")
        .or_else(|| std::env::var_os("POMODORO_DIR"))
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".claude").join("productivity")))
        .ok_or_else(|| CoreError::DataDir("cannot determine home directory".into()))?;

    fs::create_dir_all(&dir).map_err(|e| CoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Locations of every document the orchestrator touches.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Paths rooted at [`data_dir`].
    pub fn discover() -> Result<Self> {
        Ok(Self::new(data_dir()?))
    }

    pub fn session(&self) -> PathBuf {
        self.root.join("session.yaml")
    }

    pub fn log(&self) -> PathBuf {
        self.root.join("log.yaml")
    }

    pub fn tasks(&self) -> PathBuf {
        self.root.join("tasks.yaml")
    }

    pub fn chore_timers(&self) -> PathBuf {
        self.root.join("chore_timers.yaml")
    }

    pub fn reminders(&self) -> PathBuf {
        self.root.join("reminders.yaml")
    }

    pub fn queue(&self) -> PathBuf {
        self.root.join("prompt_queue.json")
    }

    pub fn ack(&self) -> PathBuf {
        self.root.join("acknowledged.txt")
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Create the directory and write empty shapes for any missing document.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        ensure_yaml(&self.session(), &crate::session::Session::default())?;
        ensure_yaml(&self.log(), &crate::history::WorkLog::default())?;
        ensure_yaml(&self.tasks(), &crate::tasks::TaskCatalog::default())?;
        ensure_yaml(&self.chore_timers(), &crate::due::ChoreTimers::default())?;
        ensure_yaml(&self.reminders(), &crate::due::Reminders::default())?;
        Ok(())
    }
}

fn ensure_yaml<T: Serialize>(path: &Path, empty: &T) -> Result<()> {
    if !path.exists() {
        save_yaml(path, empty)?;
    }
    Ok(())
}

/// Write `bytes` to `path` via a temp file in the same directory and a rename.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(bytes)?;
    tmp.sync_all()?;
    drop(tmp);

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), "atomic write completed");
    Ok(())
}

/// Load a YAML document, returning its default when the file is missing or blank.
pub fn load_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml_bw::from_str(&content).map_err(|e| CoreError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml_bw::to_string(value)?;
    atomic_write(path, content.as_bytes())
}

/// Format a local wall-clock time the way documents store it.
pub fn format_local_time(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse a time written by a human or by the agent.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS[.f]]`, the same with a space separator, and
/// RFC 3339 (converted to local time).
pub fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
