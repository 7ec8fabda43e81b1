//! Prompt texts queued for the agent.

use chrono::NaiveDateTime;

pub const SESSION_START: &str = "A pomodoro session is starting. Ask the user what they want to work on, then write '<action>:<task name>' (for example 'start:Writing') to begin the first work session.";

pub const WORK_COMPLETE: &str = "Work session complete. Remind the user to drink water, stand up and stretch, and check on household chores.";

pub const BREAK_COMPLETE: &str = "Break complete. Offer the user a choice: continue their previous work session if any, or try a different task.";

pub const END_SESSION: &str = "The user has been working for several hours. Gently suggest they might want to end the session for today. Ask if they'd like to wrap up, summarise what was accomplished, and save progress.";

pub const STARTUP_NEEDS_TASK: &str = "The session has no task yet. Write '<action>:<task name>' (for example 'start:Writing') to begin, or 'end' to cancel.";

pub fn extension_complete(label: &str) -> String {
    format!(
        "The extended {label} session is over. Check in with the user, then write 'continue', 'end' or '<action>:<task name>'."
    )
}

pub fn ack_overdue(minutes: u64) -> String {
    format!(
        "No acknowledgment for {minutes} minutes. If the user has stepped away, consider writing 'extend' to keep the timer going on their behalf, or 'end' to close the session."
    )
}

pub fn due_items(items: &[String]) -> String {
    format!("Due now: {}. Remind the user about these.", items.join(", "))
}

pub fn meeting_negotiation(meeting: &str, minutes_until: f64, extension: f64) -> String {
    format!(
        "'{meeting}' starts in {:.0} minutes, which leaves no room for a full break and another work session. Ask the user whether to extend this work session by {:.0} minutes and take the break just before the meeting (write 'extend'), or take the break now (write 'continue').",
        minutes_until.ceil(),
        extension.floor()
    )
}

pub fn meeting_warning(meeting: &str, minutes_until: u32, start_time: &str) -> String {
    format!(
        "'{meeting}' starts in {minutes_until} minutes (at {start_time}). Let the user know so they can wrap up and get ready."
    )
}

pub fn end_session_suggestion(hours_elapsed: f64, now: NaiveDateTime) -> String {
    format!(
        "{END_SESSION}\nSession duration so far: {hours_elapsed:.1} hours. Current time: {}.",
        now.format("%H:%M")
    )
}

pub fn storage_failure(file: &str, error: &str) -> String {
    format!(
        "The session is paused because {file} could not be used: {error}. Fix the file; the timer picks up where it left off as soon as it can be read again."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn negotiation_rounds_for_humans() {
        let text = meeting_negotiation("Standup", 19.2, 14.2);
        assert!(text.contains("starts in 20 minutes"));
        assert!(text.contains("by 14 minutes"));
    }

    #[test]
    fn end_suggestion_carries_time() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(17, 45, 0)
            .unwrap();
        let text = end_session_suggestion(8.25, now);
        assert!(text.starts_with(END_SESSION));
        assert!(text.contains("8.2 hours") || text.contains("8.3 hours"));
        assert!(text.contains("17:45"));
    }

    #[test]
    fn storage_failure_names_the_file() {
        let text = storage_failure("session.yaml", "unclosed bracket");
        assert!(text.contains("session.yaml"));
        assert!(text.contains("unclosed bracket"));
    }
}
