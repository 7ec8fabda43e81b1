use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::orchestrator::Phase;

/// Every notable occurrence in a running session produces an Event.
/// The notifier turns them into one-line desktop notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        minutes: f64,
        task: Option<String>,
        at: NaiveDateTime,
    },
    PhaseCompleted {
        phase: Phase,
        elapsed_secs: u64,
        at: NaiveDateTime,
    },
    /// `timer_override_minutes` was applied to a running countdown.
    OverrideApplied {
        remaining_secs: u64,
        at: NaiveDateTime,
    },
    ExtensionApplied {
        added_secs: u64,
        remaining_secs: u64,
        at: NaiveDateTime,
    },
    TaskSwitched {
        from: Option<String>,
        to: String,
        at: NaiveDateTime,
    },
    MeetingWarning {
        meeting: String,
        threshold_minutes: u32,
        minutes_until: u32,
        at: NaiveDateTime,
    },
    AckReceived {
        content: String,
        at: NaiveDateTime,
    },
    /// Still waiting on the agent.
    AckReminder {
        waited_secs: u64,
        at: NaiveDateTime,
    },
    SessionEnded {
        hours: f64,
        work_sessions: u32,
        fun_sessions: u32,
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn title(&self) -> String {
        match self {
            Event::MeetingWarning { meeting, .. } => format!("Meeting: {meeting}"),
            Event::SessionEnded { .. } => "Session complete".to_string(),
            _ => "Pomodoro".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Event::PhaseStarted { phase, minutes, task, .. } => match task {
                Some(task) => format!("{phase} started: {minutes} min on {task}"),
                None => format!("{phase} started: {minutes} min"),
            },
            Event::PhaseCompleted { phase, .. } => format!("{phase} session complete!"),
            Event::OverrideApplied { remaining_secs, .. } => {
                format!("Timer changed: {} left", format_mm_ss(*remaining_secs))
            }
            Event::ExtensionApplied { added_secs, .. } => {
                format!("Timer extended by {} min", added_secs / 60)
            }
            Event::TaskSwitched { to, .. } => format!("Switched to {to}"),
            Event::MeetingWarning { minutes_until, .. } => {
                format!("Starts in {minutes_until} minutes")
            }
            Event::AckReceived { content, .. } => format!("Acknowledged: {content}"),
            Event::AckReminder { waited_secs, .. } => {
                format!("Waiting for check-in ({} min)", waited_secs / 60)
            }
            Event::SessionEnded { hours, work_sessions, fun_sessions, .. } => format!(
                "{hours:.1} hours, {work_sessions} work and {fun_sessions} fun sessions"
            ),
        }
    }

    /// Events that are only worth a log line, not a desktop popup.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Event::PhaseStarted { .. } | Event::AckReceived { .. })
    }
}

pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn phase_completed_body() {
        let event = Event::PhaseCompleted {
            phase: Phase::Work,
            elapsed_secs: 1500,
            at: at(),
        };
        assert_eq!(event.title(), "Pomodoro");
        assert_eq!(event.body(), "Work session complete!");
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::TaskSwitched {
            from: None,
            to: "Writing".into(),
            at: at(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TaskSwitched");
        assert_eq!(json["to"], "Writing");
    }

    #[test]
    fn mm_ss() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(1499), "24:59");
    }
}
