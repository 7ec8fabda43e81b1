//! Phase orchestrator.
//!
//! Drives the `Work -> Break -> Work ...` loop. Each phase runs a countdown,
//! queues a prompt for the agent and then blocks on the ack mailbox; the
//! action that comes back decides the next phase:
//!
//! | phase | `end`   | `extend`              | `continue` / `<verb>:<task>` |
//! |-------|---------|-----------------------|------------------------------|
//! | Work  | Ended   | more work, wait again | Break                        |
//! | Break | Ended   | more break, wait again| Work                         |
//!
//! Work time is booked into `session_log` when a work phase is left, with
//! the time spent waiting for the ack folded into the last task worked on.
//! Ending flushes `session_log` into the permanent log, resets the session
//! and clears the queue.
//!
//! Storage never ends a session. Reads that only feed a prompt or a default
//! fall back and log; writes that must land are retried every poll interval
//! after one `error` prompt naming the broken file.

pub mod prompts;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ack::{AckParser, Action};
use crate::context::SessionContext;
use crate::error::Result;
use crate::events::Event;
use crate::monitor::MeetingMonitor;
use crate::queue::kinds;
use crate::session::{Session, TaskStats};
use crate::storage::format_local_time;
use crate::tasks::{TaskCatalog, TaskType};
use crate::timer::{CountdownEngine, Segment};

const SESSION_FILE: &str = "session.yaml";
const LOG_FILE: &str = "log.yaml";
const QUEUE_FILE: &str = "prompt_queue.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Work,
    Break,
    Ended,
}

impl Phase {
    /// Countdown label.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "WORK",
            Phase::Break => "BREAK",
            Phase::Ended => "ENDED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Work => write!(f, "Work"),
            Phase::Break => write!(f, "Break"),
            Phase::Ended => write!(f, "Ended"),
        }
    }
}

/// What a finished session amounted to, captured just before the reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub hours: f64,
    pub work_sessions: u32,
    pub fun_sessions: u32,
    pub session_log: BTreeMap<String, TaskStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AckOutcome {
    pub action: Action,
    pub waited_secs: u64,
}

struct MonitorHandle {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

pub struct PhaseOrchestrator {
    ctx: SessionContext,
    countdown: CountdownEngine,
    parser: AckParser,
    monitor_enabled: bool,
    monitor: Option<MonitorHandle>,
    /// Extension offered by the last meeting negotiation, used by `extend`.
    pending_extension: Option<f64>,
    summary: Option<SessionSummary>,
}

impl PhaseOrchestrator {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            countdown: CountdownEngine::new(ctx.clone()),
            parser: ctx.ack_parser(),
            ctx,
            monitor_enabled: true,
            monitor: None,
            pending_extension: None,
            summary: None,
        }
    }

    /// Do not spawn the meeting monitor.
    pub fn without_monitor(mut self) -> Self {
        self.monitor_enabled = false;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Start, then step until the session ends.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let mut phase = self.start().await?;
        while phase != Phase::Ended {
            phase = self.step(phase).await?;
        }
        Ok(self.summary.take().unwrap_or_default())
    }

    /// Resume or reset the stored session, make sure it has a task, stamp the
    /// start time and spawn the meeting monitor.
    pub async fn start(&mut self) -> Result<Phase> {
        let resumed = self.persist(SESSION_FILE, || self.prepare_session()).await;
        let has_task = self
            .persist(SESSION_FILE, || self.ctx.sessions.load())
            .await
            .current_task
            .is_some();

        if !(resumed && has_task) {
            self.enqueue(kinds::SESSION_START, prompts::SESSION_START)
                .await;
            loop {
                let ack = self.wait_for_ack().await;
                match ack.action {
                    Action::End => {
                        self.finish_session().await;
                        return Ok(Phase::Ended);
                    }
                    action @ Action::Task { .. } => {
                        self.apply_task(&action).await;
                        break;
                    }
                    _ => {
                        self.enqueue(kinds::ERROR, prompts::STARTUP_NEEDS_TASK)
                            .await;
                    }
                }
            }
        }

        let now = self.ctx.clock.now();
        let session = self
            .persist(SESSION_FILE, || {
                self.ctx.sessions.update(&mut |s| s.mark_started(now))
            })
            .await;
        info!(
            task = session.current_task.as_deref().unwrap_or("-"),
            task_type = session.current_task_type.map(|t| t.as_str()).unwrap_or("-"),
            work_minutes = self.ctx.config.timer.work_minutes,
            break_minutes = self.ctx.config.timer.break_minutes,
            resumed,
            "session started"
        );
        self.start_monitor();
        Ok(Phase::Work)
    }

    /// Reset a stale or never-started session. Returns true when the stored
    /// session is resumed as is.
    pub fn prepare_session(&self) -> Result<bool> {
        let now = self.ctx.clock.now();
        let session = self.ctx.sessions.load()?;
        if !session.is_stale(now, self.ctx.config.session.stale_after_hours) {
            info!(task = ?session.current_task, "resuming session");
            return Ok(true);
        }
        if session.started_at().is_some() {
            info!(start = ?session.start_time, "resetting stale session");
        }
        self.reset_documents()?;
        Ok(false)
    }

    /// Run one phase to completion. Storage failures inside a phase are
    /// reported to the agent and retried, never returned.
    pub async fn step(&mut self, phase: Phase) -> Result<Phase> {
        Ok(match phase {
            Phase::Work => self.run_work_phase().await,
            Phase::Break => self.run_break_phase().await,
            Phase::Ended => Phase::Ended,
        })
    }

    async fn run_work_phase(&mut self) -> Phase {
        let minutes = self.take_planned_minutes(Phase::Work);
        self.announce_start(Phase::Work, minutes);
        let outcome = self.countdown.run(minutes, Phase::Work.label()).await;
        self.announce_end(Phase::Work, outcome.elapsed_seconds);
        let mut segments = outcome.task_switches;

        let prompt = self.compose_work_prompt();
        self.enqueue(kinds::WORK_COMPLETE, &prompt).await;
        self.suggest_end_if_due();

        loop {
            let ack = self.wait_for_ack().await;
            self.fold_wait(&mut segments, ack.waited_secs);
            match ack.action {
                Action::Extend => {
                    let minutes = match self.pending_extension.take() {
                        Some(minutes) => minutes,
                        None => self.take_planned_minutes(Phase::Work),
                    };
                    info!(minutes, "work phase extended");
                    let more = self.countdown.run(minutes, Phase::Work.label()).await;
                    self.announce_end(Phase::Work, more.elapsed_seconds);
                    segments.extend(more.task_switches);
                    self.enqueue(
                        kinds::EXTENSION_COMPLETE,
                        &prompts::extension_complete("work"),
                    )
                    .await;
                }
                action => {
                    self.pending_extension = None;
                    self.book_work(&segments).await;
                    if action.is_end() {
                        self.finish_session().await;
                        return Phase::Ended;
                    }
                    self.apply_task(&action).await;
                    return Phase::Break;
                }
            }
        }
    }

    async fn run_break_phase(&mut self) -> Phase {
        let minutes = self.take_planned_minutes(Phase::Break);
        self.announce_start(Phase::Break, minutes);
        let outcome = self.countdown.run(minutes, Phase::Break.label()).await;
        self.announce_end(Phase::Break, outcome.elapsed_seconds);

        self.enqueue(kinds::BREAK_COMPLETE, prompts::BREAK_COMPLETE)
            .await;
        self.suggest_end_if_due();

        loop {
            let ack = self.wait_for_ack().await;
            match ack.action {
                Action::Extend => {
                    let minutes = self.take_planned_minutes(Phase::Break);
                    info!(minutes, "break extended");
                    let more = self.countdown.run(minutes, Phase::Break.label()).await;
                    self.announce_end(Phase::Break, more.elapsed_seconds);
                    self.enqueue(
                        kinds::EXTENSION_COMPLETE,
                        &prompts::extension_complete("break"),
                    )
                    .await;
                }
                Action::End => {
                    self.finish_session().await;
                    return Phase::Ended;
                }
                action => {
                    self.apply_task(&action).await;
                    return Phase::Work;
                }
            }
        }
    }

    /// Poll the mailbox until an ack parses. Unparseable acks have already
    /// been answered on the queue by the parser, so they are simply skipped.
    pub async fn wait_for_ack(&self) -> AckOutcome {
        let poll = self.poll_interval();
        let reminder_secs = self.ctx.config.ack.reminder_minutes * 60;
        let overdue_secs = self.ctx.config.ack.overdue_minutes * 60;
        let started = self.ctx.clock.now();
        let mut next_reminder = reminder_secs;
        let mut overdue_sent = false;

        info!("waiting for check-in");
        loop {
            match self.ctx.mailbox.take() {
                Ok(Some(content)) => {
                    let now = self.ctx.clock.now();
                    let waited_secs = seconds_between(started, now);
                    self.ctx.notifier.notify(&Event::AckReceived {
                        content: content.clone(),
                        at: now,
                    });
                    if let Some(action) = self.parser.parse(&content) {
                        let stamp = format_local_time(now);
                        if let Err(e) = self
                            .ctx
                            .sessions
                            .update(&mut |s| s.last_ack_time = Some(stamp.clone()))
                        {
                            warn!(error = %e, "could not record ack time");
                        }
                        info!(?action, waited_secs, "acknowledged");
                        return AckOutcome {
                            action,
                            waited_secs,
                        };
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "could not read ack"),
            }

            self.ctx.clock.sleep(poll).await;
            let now = self.ctx.clock.now();
            let waited_secs = seconds_between(started, now);

            if reminder_secs > 0 && waited_secs >= next_reminder {
                next_reminder += reminder_secs;
                self.ctx
                    .notifier
                    .notify(&Event::AckReminder { waited_secs, at: now });
            }
            if overdue_secs > 0 && !overdue_sent && waited_secs >= overdue_secs {
                overdue_sent = true;
                warn!(waited_secs, "check-in overdue");
                if let Err(e) = self.ctx.queue.append(
                    kinds::ACK_OVERDUE,
                    &prompts::ack_overdue(self.ctx.config.ack.overdue_minutes),
                ) {
                    warn!(error = %e, "failed to queue overdue prompt");
                }
            }
        }
    }

    /// Flush `session_log` into the permanent log, reset the session, clear
    /// the queue and stop the meeting monitor. Fails on the first storage
    /// error; used for shutdown, where there is nobody left to retry.
    pub fn end_session(&mut self) -> Result<SessionSummary> {
        self.stop_monitor();
        self.pending_extension = None;

        let now = self.ctx.clock.now();
        let session = self.ctx.sessions.load()?;
        if !session.session_log.is_empty() {
            self.flush_log(&session, now)?;
        }
        self.reset_documents()?;
        Ok(self.conclude(&session, now))
    }

    /// `end_session` for the phase loop: each step is retried until it
    /// succeeds.
    async fn finish_session(&mut self) -> SessionSummary {
        self.stop_monitor();
        self.pending_extension = None;

        let now = self.ctx.clock.now();
        let session = self
            .persist(SESSION_FILE, || self.ctx.sessions.load())
            .await;
        if !session.session_log.is_empty() {
            self.persist(LOG_FILE, || self.flush_log(&session, now))
                .await;
        }
        self.persist(SESSION_FILE, || self.reset_documents()).await;
        self.conclude(&session, now)
    }

    fn flush_log(&self, session: &Session, now: NaiveDateTime) -> Result<()> {
        let mut log = self.ctx.log.load()?;
        log.merge_session(&session.session_log, now.date());
        self.ctx.log.save(&log)
    }

    fn reset_documents(&self) -> Result<()> {
        self.ctx.sessions.save(&Session::fresh(&self.ctx.config))?;
        self.ctx.queue.clear()
    }

    fn conclude(&mut self, session: &Session, now: NaiveDateTime) -> SessionSummary {
        let summary = SessionSummary {
            hours: session.hours_elapsed(now),
            work_sessions: session.work_sessions_completed,
            fun_sessions: session.fun_sessions_completed,
            session_log: session.session_log.clone(),
        };
        info!(
            hours = summary.hours,
            work_sessions = summary.work_sessions,
            fun_sessions = summary.fun_sessions,
            "session ended"
        );
        self.ctx.notifier.notify(&Event::SessionEnded {
            hours: summary.hours,
            work_sessions: summary.work_sessions,
            fun_sessions: summary.fun_sessions,
            at: now,
        });
        self.summary = Some(summary.clone());
        summary
    }

    /// Run `op` until it succeeds, sleeping one poll interval between tries.
    /// The first failure of a streak is queued as an `error` prompt naming
    /// `file` so the agent can repair it.
    async fn persist<T>(&self, file: &str, mut op: impl FnMut() -> Result<T>) -> T {
        let poll = self.poll_interval();
        let mut reported = false;
        loop {
            match op() {
                Ok(value) => {
                    if reported {
                        info!(file, "storage recovered");
                    }
                    return value;
                }
                Err(e) => {
                    warn!(file, error = %e, "storage operation failed; will retry");
                    if !reported {
                        reported = true;
                        let prompt = prompts::storage_failure(file, &e.to_string());
                        if let Err(e) = self.ctx.queue.append(kinds::ERROR, &prompt) {
                            warn!(error = %e, "could not queue storage error");
                        }
                    }
                    self.ctx.clock.sleep(poll).await;
                }
            }
        }
    }

    async fn enqueue(&self, kind: &str, prompt: &str) {
        self.persist(QUEUE_FILE, || self.ctx.queue.append(kind, prompt))
            .await;
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.ctx.config.ack.poll_interval_seconds.max(1))
    }

    fn start_monitor(&mut self) {
        if !self.monitor_enabled || self.monitor.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = MeetingMonitor::new(self.ctx.clone()).spawn(cancel.clone());
        self.monitor = Some(MonitorHandle {
            cancel,
            _handle: handle,
        });
    }

    fn stop_monitor(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.cancel.cancel();
            debug!("meeting monitor cancelled");
        }
    }

    /// The one-shot `next_*_minutes` plan if the agent set one, else the
    /// configured length. The plan is cleared once used. An unreadable
    /// session falls back to the configured length.
    fn take_planned_minutes(&self, phase: Phase) -> f64 {
        let planned = match self.ctx.sessions.load() {
            Ok(mut session) => {
                let planned = match phase {
                    Phase::Break => session.next_break_minutes.take(),
                    _ => session.next_work_minutes.take(),
                };
                if planned.is_some() {
                    if let Err(e) = self.ctx.sessions.save(&session) {
                        warn!(%phase, error = %e, "could not clear planned length");
                    }
                }
                planned
            }
            Err(e) => {
                warn!(%phase, error = %e, "could not read planned length; using configured length");
                None
            }
        };
        let default = match phase {
            Phase::Break => self.ctx.config.timer.break_minutes,
            _ => self.ctx.config.timer.work_minutes,
        };
        planned
            .filter(|m| m.is_finite() && *m >= 0.0)
            .unwrap_or(default)
    }

    fn current_task(&self) -> Option<String> {
        match self.ctx.sessions.load() {
            Ok(session) => session.current_task,
            Err(e) => {
                warn!(error = %e, "could not read current task");
                None
            }
        }
    }

    fn announce_start(&self, phase: Phase, minutes: f64) {
        let task = self.current_task();
        info!(%phase, minutes, task = task.as_deref().unwrap_or("-"), "phase started");
        self.ctx.notifier.notify(&Event::PhaseStarted {
            phase,
            minutes,
            task,
            at: self.ctx.clock.now(),
        });
    }

    fn announce_end(&self, phase: Phase, elapsed_secs: u64) {
        info!(%phase, elapsed_secs, "phase complete");
        self.ctx.notifier.notify(&Event::PhaseCompleted {
            phase,
            elapsed_secs,
            at: self.ctx.clock.now(),
        });
    }

    async fn apply_task(&self, action: &Action) {
        if let Some((task, task_type)) = action.task() {
            self.persist(SESSION_FILE, || {
                self.ctx.sessions.update(&mut |s| s.set_task(task, task_type))
            })
            .await;
            info!(task, %task_type, "task set");
        }
    }

    /// Attribute `waited_secs` to the last segment; the operator is presumed
    /// to stay on their most recent task while the agent is away.
    fn fold_wait(&self, segments: &mut Vec<Segment>, waited_secs: u64) {
        if waited_secs == 0 {
            return;
        }
        match segments.last_mut() {
            Some(last) => last.seconds_spent += waited_secs,
            None => segments.push(Segment {
                task_name: self.current_task(),
                seconds_spent: waited_secs,
            }),
        }
    }

    /// Book a finished work phase: hours per segment, one session for the
    /// last task, and the work or fun counter by that task's type.
    async fn book_work(&self, segments: &[Segment]) {
        let catalog = self.ctx.tasks.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read tasks; booking by the session's task type");
            TaskCatalog::default()
        });
        let session = self
            .persist(SESSION_FILE, || {
                self.ctx.sessions.update(&mut |s| {
                    for segment in segments {
                        if let Some(task) = &segment.task_name {
                            s.add_hours(task, segment.seconds_spent);
                        }
                    }
                    let last = segments
                        .iter()
                        .rev()
                        .find_map(|seg| seg.task_name.clone())
                        .or_else(|| s.current_task.clone());
                    let task_type = last
                        .as_deref()
                        .and_then(|t| catalog.resolve(t))
                        .or(s.current_task_type)
                        .unwrap_or(TaskType::Work);
                    if let Some(task) = &last {
                        s.add_session(task);
                    }
                    match task_type {
                        TaskType::Work => s.work_sessions_completed += 1,
                        TaskType::Fun => s.fun_sessions_completed += 1,
                    }
                })
            })
            .await;
        debug!(
            work_sessions = session.work_sessions_completed,
            fun_sessions = session.fun_sessions_completed,
            logged_hours = session.total_logged_hours(),
            "work phase booked"
        );
    }

    fn compose_work_prompt(&mut self) -> String {
        let session = self.ctx.sessions.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read session for the work prompt");
            Session::default()
        });
        let now = self.ctx.clock.now();
        let mut parts = vec![prompts::WORK_COMPLETE.to_string()];

        match self.ctx.due.due_items(now, &session.completed_items) {
            Ok(items) if !items.is_empty() => parts.push(prompts::due_items(&items)),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read due items"),
        }

        self.pending_extension = None;
        if let Some((meeting, minutes_until, extension)) = self.negotiation(&session, now) {
            info!(%meeting, minutes_until, extension, "offering extension before meeting");
            self.pending_extension = Some(extension);
            parts.push(prompts::meeting_negotiation(&meeting, minutes_until, extension));
        }
        parts.join("\n\n")
    }

    /// The nearest meeting that is inside the negotiation window and too
    /// close for a full break plus another work session, with the offered
    /// extension length.
    fn negotiation(&self, session: &Session, now: NaiveDateTime) -> Option<(String, f64, f64)> {
        let timer = &self.ctx.config.timer;
        let break_minutes = session.next_break_minutes.unwrap_or(timer.break_minutes);
        let work_minutes = session.next_work_minutes.unwrap_or(timer.work_minutes);
        let window = self.ctx.config.meetings.negotiation_window_minutes;

        let (meeting, minutes_until) = session
            .meetings
            .iter()
            .filter(|m| !session.completed_items.contains(&m.name))
            .filter_map(|m| m.minutes_until(now).map(|until| (m, until)))
            .filter(|(_, until)| *until > 0.0 && *until <= window)
            .filter(|(_, until)| *until < break_minutes + work_minutes)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let extension = if minutes_until - break_minutes >= 1.0 {
            minutes_until - break_minutes
        } else {
            minutes_until
        };
        Some((meeting.name.clone(), minutes_until, extension))
    }

    /// Queue an `end_session_suggestion` once the session has run long
    /// enough, unless one is still waiting undelivered.
    fn suggest_end_if_due(&self) {
        let session = match self.ctx.sessions.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not read session for the end suggestion");
                return;
            }
        };
        let now = self.ctx.clock.now();
        if session.started_at().is_none() || !session.should_suggest_end(now) {
            return;
        }
        let prompt = prompts::end_session_suggestion(session.hours_elapsed(now), now);
        match self.ctx.queue.append_once(kinds::END_SESSION_SUGGESTION, &prompt) {
            Ok(Some(_)) => info!("suggested ending the session"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not queue end suggestion"),
        }
    }
}

fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> u64 {
    (to - from).num_seconds().max(0) as u64
}
