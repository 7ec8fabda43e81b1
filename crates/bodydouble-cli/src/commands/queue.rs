//! Prompt queue commands for CLI.

use std::sync::Arc;

use bodydouble_core::{DataPaths, PromptQueue, QueueEntry, SystemClock};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum QueueAction {
    /// List queued prompts
    List {
        /// Only prompts not yet delivered
        #[arg(long)]
        pending: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the oldest undelivered prompt and mark it delivered
    Next {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a prompt delivered
    Deliver {
        /// Prompt ID
        id: u64,
    },
    /// Remove every prompt
    Clear,
}

fn open() -> Result<PromptQueue, Box<dyn std::error::Error>> {
    let paths = DataPaths::discover()?;
    Ok(PromptQueue::new(paths.queue(), Arc::new(SystemClock)))
}

fn print_entry(entry: &QueueEntry) {
    let mark = if entry.delivered { " " } else { "*" };
    println!("{mark} #{} [{}] {}", entry.id, entry.kind, entry.timestamp);
    for line in entry.prompt.lines() {
        println!("    {line}");
    }
}

pub fn run(action: QueueAction) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open()?;
    match action {
        QueueAction::List { pending, json } => {
            let entries = if pending {
                queue.pending()?
            } else {
                queue.entries()?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("queue is empty");
            } else {
                for entry in &entries {
                    print_entry(entry);
                }
            }
        }
        QueueAction::Next { json } => match queue.take_next()? {
            Some(entry) if json => println!("{}", serde_json::to_string_pretty(&entry)?),
            Some(entry) => println!("{}", entry.prompt),
            None if json => println!("null"),
            None => {}
        },
        QueueAction::Deliver { id } => {
            if !queue.mark_delivered(id)? {
                return Err(format!("no prompt with id {id}").into());
            }
            println!("ok");
        }
        QueueAction::Clear => {
            queue.clear()?;
            println!("queue cleared");
        }
    }
    Ok(())
}
