//! Due items: one-shot chore timers and recurring reminders.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::storage::{format_local_time, load_yaml, parse_local_time, save_yaml};

/// A chore with a deadline. Created externally; its entry in
/// `chore_timers.yaml` is removed by whoever finishes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreTimer {
    pub name: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoreTimers {
    #[serde(default)]
    pub timers: Vec<ChoreTimer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReminderDays {
    /// `"daily"`, or a single day code such as `"mon"`.
    Keyword(String),
    Days(BTreeSet<String>),
}

impl ReminderDays {
    pub fn applies_on(&self, day: Weekday) -> bool {
        let code = day_code(day);
        match self {
            ReminderDays::Keyword(k) => {
                let k = k.trim().to_ascii_lowercase();
                k == "daily" || k == code
            }
            ReminderDays::Days(days) => days
                .iter()
                .any(|d| d.trim().eq_ignore_ascii_case(code)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub name: String,
    /// `HH:MM`, local time.
    pub time: String,
    pub days: ReminderDays,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reminders {
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

impl ChoreTimers {
    pub fn due(&self, now: NaiveDateTime) -> Vec<String> {
        self.timers
            .iter()
            .filter(|timer| match parse_local_time(&timer.end_time) {
                Some(end) => end <= now,
                None => {
                    warn!(chore = %timer.name, end_time = %timer.end_time, "unparseable chore end time");
                    false
                }
            })
            .map(|timer| timer.name.clone())
            .collect()
    }
}

impl Reminders {
    pub fn due(&self, now: NaiveDateTime, completed: &BTreeSet<String>) -> Vec<String> {
        self.reminders
            .iter()
            .filter(|r| !completed.contains(&r.name))
            .filter(|r| r.days.applies_on(now.weekday()))
            .filter(|r| match NaiveTime::parse_from_str(r.time.trim(), "%H:%M") {
                Ok(at) => now.time() >= at,
                Err(_) => {
                    warn!(reminder = %r.name, time = %r.time, "unparseable reminder time");
                    false
                }
            })
            .map(|r| r.name.clone())
            .collect()
    }
}

/// Reads both due-item documents on demand.
#[derive(Debug, Clone)]
pub struct DueItemSource {
    chores: PathBuf,
    reminders: PathBuf,
}

impl DueItemSource {
    pub fn new(chores: impl Into<PathBuf>, reminders: impl Into<PathBuf>) -> Self {
        Self {
            chores: chores.into(),
            reminders: reminders.into(),
        }
    }

    pub fn load_chores(&self) -> Result<ChoreTimers> {
        load_yaml(&self.chores)
    }

    pub fn load_reminders(&self) -> Result<Reminders> {
        load_yaml(&self.reminders)
    }

    /// Expired chores followed by due, uncompleted reminders. Names are deduplicated.
    pub fn due_items(&self, now: NaiveDateTime, completed: &BTreeSet<String>) -> Result<Vec<String>> {
        let mut items = self.load_chores()?.due(now);
        for name in self.load_reminders()?.due(now, completed) {
            if !items.contains(&name) {
                items.push(name);
            }
        }
        Ok(items)
    }

    pub fn add_chore(&self, name: &str, end_time: NaiveDateTime) -> Result<()> {
        let mut chores = self.load_chores()?;
        chores.timers.push(ChoreTimer {
            name: name.to_string(),
            end_time: format_local_time(end_time),
        });
        save_yaml(&self.chores, &chores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2026-03-02 is a Monday.
    fn monday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn chore_due_after_end_time() {
        let chores = ChoreTimers {
            timers: vec![
                ChoreTimer { name: "Laundry".into(), end_time: "2026-03-02T10:00".into() },
                ChoreTimer { name: "Oven".into(), end_time: "2026-03-02T11:00".into() },
                ChoreTimer { name: "Broken".into(), end_time: "whenever".into() },
            ],
        };
        assert_eq!(chores.due(monday(10, 30)), vec!["Laundry".to_string()]);
    }

    #[test]
    fn reminders_respect_days_time_and_completion() {
        let reminders: Reminders = serde_yaml_bw::from_str(
            "reminders:\n  - name: Meds\n    time: \"09:00\"\n    days: daily\n  - name: Bins\n    time: \"18:00\"\n    days: [mon, thu]\n  - name: Gym\n    time: \"08:00\"\n    days: [sat]\n",
        )
        .unwrap();
        let mut completed = BTreeSet::new();
        assert_eq!(reminders.due(monday(8, 59), &completed), Vec::<String>::new());
        assert_eq!(reminders.due(monday(9, 0), &completed), vec!["Meds".to_string()]);
        assert_eq!(
            reminders.due(monday(18, 5), &completed),
            vec!["Meds".to_string(), "Bins".to_string()]
        );
        completed.insert("Meds".to_string());
        assert_eq!(reminders.due(monday(18, 5), &completed), vec!["Bins".to_string()]);
    }

    #[test]
    fn chores_ignore_completed_items() {
        let dir = tempfile::tempdir().unwrap();
        let source = DueItemSource::new(dir.path().join("chores.yaml"), dir.path().join("reminders.yaml"));
        source.add_chore("Laundry", monday(9, 0)).unwrap();
        let mut completed = BTreeSet::new();
        completed.insert("Laundry".to_string());
        assert_eq!(
            source.due_items(monday(9, 30), &completed).unwrap(),
            vec!["Laundry".to_string()]
        );
    }
}
