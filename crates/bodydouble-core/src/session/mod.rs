//! The live session document (`session.yaml`).
//!
//! This is the single source of mutable truth shared by the phase
//! orchestrator, the countdown engine and the meeting monitor. The agent
//! also edits it directly between polls to steer a running countdown
//! (`timer_override_minutes`, `extend_minutes`, `task_switch`), to plan the
//! next phases (`next_work_minutes`, `next_break_minutes`) and to feed the
//! monitor (`meetings`, `completed_items`).

mod store;

pub use store::{environment_projection, export_environment, FileSessionStore, MemorySessionStore, SessionStore};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::storage::{format_local_time, parse_local_time, Config};
use crate::tasks::TaskType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub name: String,
    /// Local wall-clock time, see [`parse_local_time`].
    pub start_time: String,
}

impl Meeting {
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        parse_local_time(&self.start_time)
    }

    /// Fractional minutes until the meeting starts, negative once started.
    pub fn minutes_until(&self, now: NaiveDateTime) -> Option<f64> {
        self.starts_at()
            .map(|start| (start - now).num_milliseconds() as f64 / 60_000.0)
    }
}

/// Time accumulated against one task during this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub sessions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub work_sessions_completed: u32,
    #[serde(default)]
    pub fun_sessions_completed: u32,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub current_task_type: Option<TaskType>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default = "default_end_after_hours")]
    pub suggest_end_after_hours: f64,
    #[serde(default = "default_end_at_hour")]
    pub suggest_end_at_hour: f64,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub completed_items: BTreeSet<String>,
    #[serde(default)]
    pub session_log: BTreeMap<String, TaskStats>,
    #[serde(default)]
    pub last_ack_time: Option<String>,
    #[serde(default)]
    pub next_work_minutes: Option<f64>,
    #[serde(default)]
    pub next_break_minutes: Option<f64>,
    #[serde(default)]
    pub timer_override_minutes: Option<f64>,
    #[serde(default)]
    pub extend_minutes: Option<f64>,
    #[serde(default)]
    pub task_switch: Option<String>,
}

fn default_end_after_hours() -> f64 {
    9.0
}

fn default_end_at_hour() -> f64 {
    17.0
}

impl Default for Session {
    fn default() -> Self {
        Self {
            work_sessions_completed: 0,
            fun_sessions_completed: 0,
            current_task: None,
            current_task_type: None,
            start_time: None,
            suggest_end_after_hours: default_end_after_hours(),
            suggest_end_at_hour: default_end_at_hour(),
            meetings: Vec::new(),
            completed_items: BTreeSet::new(),
            session_log: BTreeMap::new(),
            last_ack_time: None,
            next_work_minutes: None,
            next_break_minutes: None,
            timer_override_minutes: None,
            extend_minutes: None,
            task_switch: None,
        }
    }
}

impl Session {
    /// The zeroed shape, with end-suggestion thresholds taken from config.
    pub fn fresh(config: &Config) -> Self {
        Self {
            suggest_end_after_hours: config.session.suggest_end_after_hours,
            suggest_end_at_hour: config.session.suggest_end_at_hour,
            ..Self::default()
        }
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.start_time.as_deref().and_then(parse_local_time)
    }

    pub fn mark_started(&mut self, now: NaiveDateTime) {
        if self.started_at().is_none() {
            self.start_time = Some(format_local_time(now));
        }
    }

    pub fn hours_elapsed(&self, now: NaiveDateTime) -> f64 {
        self.started_at()
            .map(|start| (now - start).num_seconds().max(0) as f64 / 3600.0)
            .unwrap_or(0.0)
    }

    /// True once either the elapsed-hours or the time-of-day threshold is reached.
    pub fn should_suggest_end(&self, now: NaiveDateTime) -> bool {
        if self.hours_elapsed(now) >= self.suggest_end_after_hours {
            return true;
        }
        fractional_hour(now) >= self.suggest_end_at_hour
    }

    /// A session is stale once its most recent activity is older than `max_hours`.
    /// Sessions that never started are always stale.
    pub fn is_stale(&self, now: NaiveDateTime, max_hours: f64) -> bool {
        let Some(started) = self.started_at() else {
            return true;
        };
        let last_activity = self
            .last_ack_time
            .as_deref()
            .and_then(parse_local_time)
            .map_or(started, |ack| ack.max(started));
        (now - last_activity).num_seconds() as f64 / 3600.0 > max_hours
    }

    pub fn set_task(&mut self, name: &str, task_type: TaskType) {
        self.current_task = Some(name.to_string());
        self.current_task_type = Some(task_type);
    }

    pub fn is_fun(&self) -> bool {
        self.current_task_type == Some(TaskType::Fun)
    }

    pub fn add_hours(&mut self, task: &str, seconds: u64) {
        let stats = self.session_log.entry(task.to_string()).or_default();
        stats.hours += seconds as f64 / 3600.0;
    }

    pub fn add_session(&mut self, task: &str) {
        self.session_log.entry(task.to_string()).or_default().sessions += 1;
    }

    pub fn total_logged_hours(&self) -> f64 {
        self.session_log.values().map(|s| s.hours).sum()
    }
}

/// Hour of day with minutes as a fraction, e.g. 17:30 -> 17.5.
pub fn fractional_hour(at: NaiveDateTime) -> f64 {
    at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0
}
