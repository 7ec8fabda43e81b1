//! Ack protocol: turning the agent's one-line replies into typed actions.
//!
//! Valid shapes are `end`, `continue`, `extend` and `<action>:<task name>`.
//! Parsing never fails outward. Anything unusable is answered with an
//! `error` prompt on the queue and a `None`, and the caller simply waits for
//! the next ack.

mod mailbox;

pub use mailbox::{AckMailbox, FileAckMailbox, MemoryAckMailbox};

use std::sync::Arc;

use tracing::{info, warn};

use crate::history::WorkLogStore;
use crate::queue::{kinds, PromptQueue};
use crate::tasks::{TaskCatalogStore, TaskType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    End,
    Continue,
    Extend,
    /// `<verb>:<task>`. The verb is informational; the task becomes current.
    Task {
        verb: String,
        task: String,
        task_type: TaskType,
    },
}

impl Action {
    pub fn is_end(&self) -> bool {
        matches!(self, Action::End)
    }

    pub fn task(&self) -> Option<(&str, TaskType)> {
        match self {
            Action::Task { task, task_type, .. } => Some((task.as_str(), *task_type)),
            _ => None,
        }
    }
}

pub struct AckParser {
    tasks: TaskCatalogStore,
    log: WorkLogStore,
    queue: Arc<PromptQueue>,
}

impl AckParser {
    pub fn new(tasks: TaskCatalogStore, log: WorkLogStore, queue: Arc<PromptQueue>) -> Self {
        Self { tasks, log, queue }
    }

    pub fn parse(&self, content: &str) -> Option<Action> {
        let content = content.trim();
        match content {
            "end" => return Some(Action::End),
            "continue" => return Some(Action::Continue),
            "extend" => return Some(Action::Extend),
            _ => {}
        }

        let Some((verb, task)) = content.split_once(':') else {
            self.reject(malformed_prompt(content));
            return None;
        };
        let (verb, task) = (verb.trim(), task.trim());
        if verb.is_empty() || task.is_empty() {
            self.reject(malformed_prompt(content));
            return None;
        }

        let catalog = match self.tasks.load() {
            Ok(catalog) => catalog,
            Err(e) => {
                self.reject(format!(
                    "Could not read tasks.yaml while handling the acknowledgment '{content}': {e}. Fix the file, then write the acknowledgment again."
                ));
                return None;
            }
        };
        let Some(task_type) = catalog.resolve(task) else {
            self.reject(unknown_task_prompt(task, &catalog.names()));
            return None;
        };

        match self.log.contains(task) {
            Ok(true) => {}
            Ok(false) => {
                self.reject(missing_log_prompt(task));
                return None;
            }
            Err(e) => {
                self.reject(format!(
                    "Could not read log.yaml while handling the acknowledgment '{content}': {e}. Fix the file, then write the acknowledgment again."
                ));
                return None;
            }
        }

        info!(verb, task, %task_type, "ack parsed");
        Some(Action::Task {
            verb: verb.to_string(),
            task: task.to_string(),
            task_type,
        })
    }

    fn reject(&self, prompt: String) {
        warn!(%prompt, "rejecting acknowledgment");
        if let Err(e) = self.queue.append(kinds::ERROR, &prompt) {
            warn!(error = %e, "failed to queue error prompt");
        }
    }
}

fn malformed_prompt(content: &str) -> String {
    format!(
        "Malformed acknowledgment '{content}'. Write exactly one of: 'end' to finish the session, 'continue' or 'extend' to keep the current task, or '<action>:<task name>' (for example 'continue:Writing') to set the task."
    )
}

pub(crate) fn unknown_task_prompt(task: &str, known: &[&str]) -> String {
    let known = if known.is_empty() {
        "(none)".to_string()
    } else {
        known.join(", ")
    };
    format!(
        "Task '{task}' is not in tasks.yaml. Known tasks: {known}. Check with the user whether they meant one of these; otherwise add '{task}' to work_tasks or fun_productive, then write the acknowledgment again."
    )
}

fn missing_log_prompt(task: &str) -> String {
    format!(
        "Task '{task}' is in tasks.yaml but has no entry in log.yaml. Add it under projects with total_sessions: 0, total_hours: 0 and history: [], then write the acknowledgment again."
    )
}

/// Pull `[ACK: ...]` markers out of free-form agent text.
///
/// Returns the text with markers removed and the marker contents in order.
pub fn extract_ack_markers(text: &str) -> (String, Vec<String>) {
    const OPEN: &str = "[ACK:";
    let mut cleaned = String::with_capacity(text.len());
    let mut acks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(']') else {
            break;
        };
        cleaned.push_str(&rest[..start]);
        acks.push(after[..end].trim().to_string());
        rest = &after[end + 1..];
    }
    cleaned.push_str(rest);
    (cleaned.trim().to_string(), acks)
}
