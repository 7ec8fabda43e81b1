//! TOML-based orchestrator configuration.
//!
//! Stores:
//! - Phase lengths and the countdown check cadence
//! - End-of-session suggestion thresholds
//! - Ack polling, reminder and escalation intervals
//! - Meeting warning thresholds
//! - Notification command
//!
//! Configuration is stored at `<data dir>/config.toml`. A handful of
//! `POMODORO_*` environment variables override the file at load time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::atomic_write;
use crate::error::{ConfigError, CoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: f64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: f64,
    /// Length of one countdown tick.
    #[serde(default = "default_one")]
    pub tick_seconds: u64,
    /// Session state is re-read every this many ticks.
    #[serde(default = "default_check_every_ticks")]
    pub check_every_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_end_after_hours")]
    pub suggest_end_after_hours: f64,
    /// Fractional 24h clock, e.g. 17.5 = 5:30pm.
    #[serde(default = "default_end_at_hour")]
    pub suggest_end_at_hour: f64,
    /// A stored session idle for longer than this is reset at startup.
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckConfig {
    #[serde(default = "default_one")]
    pub poll_interval_seconds: u64,
    /// Re-notify every N minutes while waiting. 0 disables.
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: u64,
    /// Queue an `ack_overdue` prompt after N minutes. 0 disables.
    #[serde(default = "default_overdue_minutes")]
    pub overdue_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingsConfig {
    #[serde(default = "default_meeting_poll")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_warning_thresholds")]
    pub warning_thresholds: Vec<u32>,
    /// Meetings closer than this at the end of a work phase are negotiated.
    #[serde(default = "default_negotiation_window")]
    pub negotiation_window_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notify_command")]
    pub command: String,
    /// Freedesktop sound name passed as a hint. Empty disables.
    #[serde(default = "default_sound")]
    pub sound: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ack: AckConfig,
    #[serde(default)]
    pub meetings: MeetingsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_work_minutes() -> f64 {
    25.0
}
fn default_break_minutes() -> f64 {
    5.0
}
fn default_one() -> u64 {
    1
}
fn default_check_every_ticks() -> u64 {
    10
}
fn default_end_after_hours() -> f64 {
    9.0
}
fn default_end_at_hour() -> f64 {
    17.0
}
fn default_stale_after_hours() -> f64 {
    12.0
}
fn default_reminder_minutes() -> u64 {
    5
}
fn default_overdue_minutes() -> u64 {
    10
}
fn default_meeting_poll() -> u64 {
    30
}
fn default_warning_thresholds() -> Vec<u32> {
    vec![60, 30, 15, 5]
}
fn default_negotiation_window() -> f64 {
    30.0
}
fn default_true() -> bool {
    true
}
fn default_notify_command() -> String {
    "notify-send".into()
}
fn default_sound() -> String {
    "message-new-instant".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            tick_seconds: default_one(),
            check_every_ticks: default_check_every_ticks(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            suggest_end_after_hours: default_end_after_hours(),
            suggest_end_at_hour: default_end_at_hour(),
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_one(),
            reminder_minutes: default_reminder_minutes(),
            overdue_minutes: default_overdue_minutes(),
        }
    }
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_meeting_poll(),
            warning_thresholds: default_warning_thresholds(),
            negotiation_window_minutes: default_negotiation_window(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_notify_command(),
            sound: default_sound(),
        }
    }
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds.max(1))
    }
}

impl Config {
    /// `timer.work_minutes` -> `/timer/work_minutes`.
    fn pointer(key: &str) -> Option<String> {
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return None;
        }
        Some(format!("/{}", key.replace('.', "/")))
    }

    /// Load from an explicit path or write and return defaults,
    /// then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Config>(&content).map_err(|e| {
                CoreError::Config(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            })?,
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                cfg
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            CoreError::Config(ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })?;
        atomic_write(path, content.as_bytes())
    }

    /// `POMODORO_WORK_MINUTES`, `POMODORO_BREAK_MINUTES`, `POMODORO_END_HOURS`
    /// and `POMODORO_END_AT_HOUR` win over the file.
    pub fn apply_env_overrides(&mut self) {
        let read = |name: &str| -> Option<f64> {
            let raw = std::env::var(name).ok()?;
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
                _ => {
                    tracing::warn!(variable = name, value = %raw, "ignoring invalid override");
                    None
                }
            }
        };
        if let Some(v) = read("POMODORO_WORK_MINUTES") {
            self.timer.work_minutes = v;
        }
        if let Some(v) = read("POMODORO_BREAK_MINUTES") {
            self.timer.break_minutes = v;
        }
        if let Some(v) = read("POMODORO_END_HOURS") {
            self.session.suggest_end_after_hours = v;
        }
        if let Some(v) = read("POMODORO_END_AT_HOUR") {
            self.session.suggest_end_at_hour = v;
        }
    }

    /// Read one setting by dot path. Strings come back bare, everything
    /// else as JSON.
    pub fn get(&self, key: &str) -> Result<String> {
        let doc = serde_json::to_value(self)?;
        let value = Self::pointer(key)
            .and_then(|p| doc.pointer(&p))
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        Ok(match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Change one setting by dot path without persisting. The raw value is
    /// read as JSON unless the setting is a string; the result must still
    /// deserialize as a `Config`.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut doc = serde_json::to_value(&*self)?;
        let slot = Self::pointer(key)
            .and_then(|p| doc.pointer_mut(&p))
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let replacement = match slot {
            serde_json::Value::String(_) => serde_json::Value::String(raw.to_string()),
            _ => serde_json::from_str(raw.trim()).map_err(|e| invalid(e.to_string()))?,
        };
        *slot = replacement;
        *self = serde_json::from_value(doc).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.work_minutes, 25.0);
        assert_eq!(parsed.meetings.warning_thresholds, vec![60, 30, 15, 5]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_minutes = 50\n").unwrap();
        assert_eq!(parsed.timer.work_minutes, 50.0);
        assert_eq!(parsed.timer.break_minutes, 5.0);
        assert_eq!(parsed.timer.check_every_ticks, 10);
        assert_eq!(parsed.ack.poll_interval_seconds, 1);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.check_every_ticks").unwrap(), "10");
        assert_eq!(cfg.get("timer.work_minutes").unwrap(), "25.0");
        assert_eq!(cfg.get("notifications.command").unwrap(), "notify-send");
        assert!(matches!(
            cfg.get("timer.missing_key"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.get("timer..work_minutes").is_err());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("timer.break_minutes", "7.5").unwrap();
        assert_eq!(cfg.timer.break_minutes, 7.5);
        cfg.set("ack.reminder_minutes", "0").unwrap();
        assert_eq!(cfg.ack.reminder_minutes, 0);
    }

    #[test]
    fn set_updates_array_from_json() {
        let mut cfg = Config::default();
        cfg.set("meetings.warning_thresholds", "[20, 10]").unwrap();
        assert_eq!(cfg.meetings.warning_thresholds, vec![20, 10]);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.nonexistent", "1").is_err());
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("notifications.enabled", "not_a_bool").is_err());
        assert!(cfg.set("timer.work_minutes", "soon").is_err());
        assert!(cfg.set("ack.reminder_minutes", "-1").is_err());
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.session.suggest_end_at_hour, 17.0);
    }

    #[test]
    fn load_from_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timer\nwork_minutes = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
