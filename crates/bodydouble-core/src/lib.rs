//! # Bodydouble Core Library
//!
//! A long-running pomodoro session orchestrator for a human working alongside
//! an external agent. The agent is slow, may restart, and talks to the
//! orchestrator only through files: it reads prompts from a queue and answers
//! with one-line acknowledgments.
//!
//! ## Architecture
//!
//! - **Phase Orchestrator**: the Work/Break state machine, booking time into
//!   the session and flushing it into the permanent log at the end
//! - **Countdown Engine**: a ticking timer the agent can override, extend or
//!   re-task while it runs, producing a per-task time ledger
//! - **Meeting Monitor**: a background loop that queues graduated warnings
//!   before meetings
//! - **Ack Protocol / Prompt Queue**: the two halves of the conversation with
//!   the agent
//! - **Storage**: YAML documents, a JSON queue and TOML configuration under
//!   one data directory
//!
//! ## Key Components
//!
//! - [`PhaseOrchestrator`]: top-level session driver
//! - [`CountdownEngine`]: live countdown
//! - [`MeetingMonitor`]: meeting warnings
//! - [`AckParser`]: ack text to [`Action`]
//! - [`PromptQueue`]: agent mailbox
//! - [`Config`]: configuration management

pub mod ack;
pub mod clock;
pub mod context;
pub mod due;
pub mod error;
pub mod events;
pub mod history;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod timer;

pub use ack::{extract_ack_markers, AckMailbox, AckParser, Action, FileAckMailbox, MemoryAckMailbox};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::SessionContext;
pub use due::{ChoreTimer, ChoreTimers, DueItemSource, Reminder, ReminderDays, Reminders};
pub use error::{ConfigError, CoreError, Result};
pub use events::Event;
pub use history::{HistoryEntry, ProjectRecord, WorkLog, WorkLogStore};
pub use monitor::MeetingMonitor;
pub use notify::{DesktopNotifier, Notifier, NullNotifier, RecordingNotifier};
pub use orchestrator::{AckOutcome, Phase, PhaseOrchestrator, SessionSummary};
pub use queue::{kinds, PromptQueue, QueueEntry};
pub use session::{FileSessionStore, Meeting, MemorySessionStore, Session, SessionStore, TaskStats};
pub use storage::{Config, DataPaths};
pub use tasks::{TaskCatalog, TaskCatalogStore, TaskEntry, TaskType};
pub use timer::{CountdownEngine, CountdownOutcome, DisplaySink, NullDisplay, Segment, TerminalDisplay};
