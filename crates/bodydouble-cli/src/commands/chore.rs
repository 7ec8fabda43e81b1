//! Chore timer commands for CLI.

use bodydouble_core::{DataPaths, DueItemSource};
use chrono::{Duration, Local};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ChoreAction {
    /// Start a chore timer that comes due after N minutes
    Add {
        /// Chore name, e.g. "Laundry"
        name: String,
        /// Minutes until due
        minutes: u32,
    },
    /// List chore timers
    List,
}

pub fn run(action: ChoreAction) -> Result<(), Box<dyn std::error::Error>> {
    let paths = DataPaths::discover()?;
    paths.ensure_layout()?;
    let due = DueItemSource::new(paths.chore_timers(), paths.reminders());

    match action {
        ChoreAction::Add { name, minutes } => {
            let end = Local::now().naive_local() + Duration::minutes(i64::from(minutes));
            due.add_chore(&name, end)?;
            println!("{name} due at {}", end.format("%H:%M"));
        }
        ChoreAction::List => {
            let now = Local::now().naive_local();
            let chores = due.load_chores()?;
            let due_now = chores.due(now);
            for timer in &chores.timers {
                let mark = if due_now.contains(&timer.name) { "due" } else { "   " };
                println!("{mark} {} at {}", timer.name, timer.end_time);
            }
        }
    }
    Ok(())
}
