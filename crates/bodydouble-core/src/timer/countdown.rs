//! Live countdown engine.
//!
//! Ticks once per `timer.tick_seconds` and every `timer.check_every_ticks`
//! ticks re-reads the session to pick up changes written by the agent, in
//! this order:
//!
//! 1. `timer_override_minutes` replaces the remaining time (0 ends the phase)
//! 2. `extend_minutes` adds to both the remaining and the planned time
//! 3. `task_switch` closes the current accounting segment and opens one for
//!    the new task
//!
//! Each applied field is cleared, and the cleared fields are saved even when
//! the task switch cannot be carried out. A failed check is logged and the
//! countdown keeps ticking. There is no other way to stop a running countdown: an
//! override to zero is observed at the next check, not instantly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ack::unknown_task_prompt;
use crate::context::SessionContext;
use crate::error::Result;
use crate::events::Event;
use crate::queue::kinds;

/// A contiguous stretch of a countdown attributed to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub task_name: Option<String>,
    pub seconds_spent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownOutcome {
    pub elapsed_seconds: u64,
    /// Initial length plus any extensions.
    pub planned_seconds: u64,
    /// Segments in order; their `seconds_spent` sum to `elapsed_seconds`.
    pub task_switches: Vec<Segment>,
}

/// Longest span a single value may ask for: one week.
pub const MAX_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// `floor(minutes * 60)`, clamping negatives and NaN to zero and anything
/// longer than [`MAX_MINUTES`] (infinity included) down to it.
pub fn minutes_to_secs(minutes: f64) -> u64 {
    if minutes.is_nan() {
        return 0;
    }
    (minutes.clamp(0.0, MAX_MINUTES) * 60.0).floor() as u64
}

#[derive(Debug)]
struct Ledger {
    segments: Vec<Segment>,
    open_task: Option<String>,
    open_since: u64,
}

impl Ledger {
    fn new(task: Option<String>) -> Self {
        Self {
            segments: Vec::new(),
            open_task: task,
            open_since: 0,
        }
    }

    fn switch(&mut self, task: String, elapsed: u64) {
        self.close_open(elapsed);
        self.open_task = Some(task);
        self.open_since = elapsed;
    }

    fn close_open(&mut self, elapsed: u64) {
        let spent = elapsed.saturating_sub(self.open_since);
        if spent > 0 {
            self.segments.push(Segment {
                task_name: self.open_task.clone(),
                seconds_spent: spent,
            });
        }
    }

    fn finish(mut self, elapsed: u64) -> Vec<Segment> {
        self.close_open(elapsed);
        self.segments
    }
}

#[derive(Debug)]
struct RunState {
    remaining: u64,
    planned: u64,
    elapsed: u64,
    ledger: Ledger,
}

pub struct CountdownEngine {
    ctx: SessionContext,
}

impl CountdownEngine {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, initial_minutes: f64, label: &str) -> CountdownOutcome {
        let initial_task = match self.ctx.sessions.load() {
            Ok(session) => session.current_task,
            Err(e) => {
                warn!(error = %e, "could not read session at countdown start");
                None
            }
        };

        let total = minutes_to_secs(initial_minutes);
        let mut state = RunState {
            remaining: total,
            planned: total,
            elapsed: 0,
            ledger: Ledger::new(initial_task),
        };

        let tick = self.ctx.config.timer.tick();
        let tick_secs = tick.as_secs();
        let check_every = self.ctx.config.timer.check_every_ticks.max(1);
        let mut ticks: u64 = 0;

        debug!(label, total_secs = total, "countdown started");
        while state.remaining > 0 {
            self.ctx.display.show(label, state.remaining);
            self.ctx.clock.sleep(tick).await;

            let step = tick_secs.min(state.remaining);
            state.remaining -= step;
            state.elapsed += step;
            ticks += 1;

            if ticks % check_every == 0 {
                if let Err(e) = self.apply_live_changes(&mut state) {
                    warn!(error = %e, "countdown check failed; will retry");
                }
            }
        }
        self.ctx.display.finish(label);

        let elapsed = state.elapsed;
        debug!(label, elapsed_secs = elapsed, "countdown finished");
        CountdownOutcome {
            elapsed_seconds: elapsed,
            planned_seconds: state.planned,
            task_switches: state.ledger.finish(elapsed),
        }
    }

    fn apply_live_changes(&self, state: &mut RunState) -> Result<()> {
        let mut session = self.ctx.sessions.load()?;
        let now = self.ctx.clock.now();
        let mut dirty = false;

        if let Some(minutes) = session.timer_override_minutes.take() {
            dirty = true;
            state.remaining = minutes_to_secs(minutes);
            info!(minutes, remaining_secs = state.remaining, "timer override applied");
            self.emit(Event::OverrideApplied {
                remaining_secs: state.remaining,
                at: now,
            });
        }

        if let Some(minutes) = session.extend_minutes.take() {
            dirty = true;
            let added = minutes_to_secs(minutes);
            if added > 0 {
                state.remaining = state.remaining.saturating_add(added);
                state.planned = state.planned.saturating_add(added);
                info!(minutes, remaining_secs = state.remaining, "timer extended");
                self.emit(Event::ExtensionApplied {
                    added_secs: added,
                    remaining_secs: state.remaining,
                    at: now,
                });
            }
        }

        if let Some(raw) = session.task_switch.take() {
            dirty = true;
            let name = raw.trim().to_string();
            if state.ledger.open_task.as_deref() != Some(name.as_str()) {
                if let Err(e) = self.switch_task(&mut session, state, &name, now) {
                    warn!(task = %name, error = %e, "task switch failed; request dropped");
                    self.report(switch_failed_prompt(&name, &e.to_string()));
                }
            }
        }

        if dirty {
            self.ctx.sessions.save(&session)?;
        }
        Ok(())
    }

    fn switch_task(
        &self,
        session: &mut crate::session::Session,
        state: &mut RunState,
        name: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        let catalog = self.ctx.tasks.load()?;
        match catalog.resolve(name) {
            Some(task_type) => {
                let from = state.ledger.open_task.clone();
                info!(from = ?from, to = %name, elapsed_secs = state.elapsed, "task switched");
                state.ledger.switch(name.to_string(), state.elapsed);
                session.set_task(name, task_type);
                self.emit(Event::TaskSwitched {
                    from,
                    to: name.to_string(),
                    at: now,
                });
            }
            None => {
                warn!(task = %name, "task switch to unknown task ignored");
                self.report(unknown_task_prompt(name, &catalog.names()));
            }
        }
        Ok(())
    }

    fn report(&self, prompt: String) {
        if let Err(e) = self.ctx.queue.append(kinds::ERROR, &prompt) {
            warn!(error = %e, "could not queue error prompt");
        }
    }

    fn emit(&self, event: Event) {
        self.ctx.notifier.notify(&event);
    }
}

fn switch_failed_prompt(task: &str, error: &str) -> String {
    format!(
        "Could not switch the timer to '{task}': {error}. The countdown keeps running on the current task. Fix tasks.yaml, then set task_switch again."
    )
}
