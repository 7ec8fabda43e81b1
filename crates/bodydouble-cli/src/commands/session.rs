//! Session commands for CLI.
//!
//! These edit `session.yaml` the same way the agent would by hand; the
//! running orchestrator picks the changes up at its next check.

use std::sync::Arc;

use bodydouble_core::storage::{format_local_time, parse_local_time};
use bodydouble_core::{
    Config, DataPaths, FileSessionStore, Meeting, PromptQueue, Session, SessionStore,
    SystemClock, TaskCatalogStore,
};
use chrono::{Local, NaiveTime};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print the live session
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the remaining time of the running countdown (0 ends it)
    Override {
        /// Minutes
        minutes: f64,
    },
    /// Add time to the running countdown
    Extend {
        /// Minutes
        minutes: f64,
    },
    /// Switch the running countdown to another task
    Switch {
        /// Task name from tasks.yaml
        task: String,
    },
    /// Plan the length of the next work or break phase
    Plan {
        /// Next work phase in minutes
        #[arg(long)]
        work: Option<f64>,
        /// Next break in minutes
        #[arg(long = "break")]
        break_minutes: Option<f64>,
    },
    /// Add a meeting to watch
    Meeting {
        /// Meeting name
        name: String,
        /// Start time, `HH:MM` today or `YYYY-MM-DDTHH:MM`
        time: String,
    },
    /// Mark a reminder or meeting as done for this session
    Complete {
        /// Item name
        item: String,
    },
    /// Discard the session and clear the queue
    Reset,
}

fn minutes(value: f64) -> Result<f64, Box<dyn std::error::Error>> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("minutes must be a non-negative number, got {value}").into());
    }
    Ok(value)
}

fn meeting_time(raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    if let Ok(time) = NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
        return Ok(format_local_time(Local::now().date_naive().and_time(time)));
    }
    parse_local_time(raw)
        .map(format_local_time)
        .ok_or_else(|| format!("unrecognized time: {raw}").into())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let paths = DataPaths::discover()?;
    let store = FileSessionStore::new(paths.session());

    match action {
        SessionAction::Show { json } => {
            let session = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                print_session(&session);
            }
        }
        SessionAction::Override { minutes: m } => {
            let m = minutes(m)?;
            store.update(&mut |s| s.timer_override_minutes = Some(m))?;
            println!("ok");
        }
        SessionAction::Extend { minutes: m } => {
            let m = minutes(m)?;
            store.update(&mut |s| s.extend_minutes = Some(m))?;
            println!("ok");
        }
        SessionAction::Switch { task } => {
            let catalog = TaskCatalogStore::new(paths.tasks());
            if catalog.resolve(&task)?.is_none() {
                return Err(format!("unknown task: {task}").into());
            }
            store.update(&mut |s| s.task_switch = Some(task.clone()))?;
            println!("ok");
        }
        SessionAction::Plan { work, break_minutes } => {
            let work = work.map(minutes).transpose()?;
            let break_minutes = break_minutes.map(minutes).transpose()?;
            store.update(&mut |s| {
                if work.is_some() {
                    s.next_work_minutes = work;
                }
                if break_minutes.is_some() {
                    s.next_break_minutes = break_minutes;
                }
            })?;
            println!("ok");
        }
        SessionAction::Meeting { name, time } => {
            let start_time = meeting_time(&time)?;
            store.update(&mut |s| {
                s.meetings.retain(|m| m.name != name);
                s.meetings.push(Meeting {
                    name: name.clone(),
                    start_time: start_time.clone(),
                });
            })?;
            println!("meeting {name} at {start_time}");
        }
        SessionAction::Complete { item } => {
            store.update(&mut |s| {
                s.completed_items.insert(item.clone());
            })?;
            println!("ok");
        }
        SessionAction::Reset => {
            let config = Config::load_from(&paths.config())?;
            store.save(&Session::fresh(&config))?;
            PromptQueue::new(paths.queue(), Arc::new(SystemClock)).clear()?;
            println!("session reset");
        }
    }
    Ok(())
}

fn print_session(session: &Session) {
    let task = session.current_task.as_deref().unwrap_or("-");
    let kind = session.current_task_type.map(|t| t.as_str()).unwrap_or("-");
    println!("Task: {task} ({kind})");
    println!("Started: {}", session.start_time.as_deref().unwrap_or("-"));
    println!(
        "Sessions: {} work, {} fun",
        session.work_sessions_completed, session.fun_sessions_completed
    );
    for meeting in &session.meetings {
        println!("Meeting: {} at {}", meeting.name, meeting.start_time);
    }
    for (name, stats) in &session.session_log {
        println!(
            "  {name}: {} sessions, {:.0} min",
            stats.sessions,
            stats.hours * 60.0
        );
    }
}
