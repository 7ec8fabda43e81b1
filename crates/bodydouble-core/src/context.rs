//! The collaborators shared by the orchestrator, the countdown engine and the
//! meeting monitor.

use std::sync::Arc;

use crate::ack::{AckMailbox, AckParser, FileAckMailbox};
use crate::clock::{Clock, SystemClock};
use crate::due::DueItemSource;
use crate::error::Result;
use crate::history::WorkLogStore;
use crate::notify::{DesktopNotifier, Notifier, NullNotifier};
use crate::queue::PromptQueue;
use crate::session::{FileSessionStore, SessionStore};
use crate::storage::{Config, DataPaths};
use crate::tasks::TaskCatalogStore;
use crate::timer::{DisplaySink, TerminalDisplay};

#[derive(Clone)]
pub struct SessionContext {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub sessions: Arc<dyn SessionStore>,
    pub tasks: TaskCatalogStore,
    pub log: WorkLogStore,
    pub due: DueItemSource,
    pub queue: Arc<PromptQueue>,
    pub mailbox: Arc<dyn AckMailbox>,
    pub notifier: Arc<dyn Notifier>,
    pub display: Arc<dyn DisplaySink>,
}

impl SessionContext {
    /// File-backed documents under `paths`, real time, silent notifications
    /// and a hidden display. Swap fields to taste.
    pub fn with_paths(paths: &DataPaths, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            sessions: Arc::new(FileSessionStore::new(paths.session())),
            tasks: TaskCatalogStore::new(paths.tasks()),
            log: WorkLogStore::new(paths.log()),
            due: DueItemSource::new(paths.chore_timers(), paths.reminders()),
            queue: Arc::new(PromptQueue::new(paths.queue(), clock.clone())),
            mailbox: Arc::new(FileAckMailbox::new(paths.ack())),
            notifier: Arc::new(NullNotifier),
            display: Arc::new(crate::timer::NullDisplay),
            clock,
        }
    }

    /// What `bodydouble run` uses: the system clock, desktop notifications
    /// and the terminal countdown line. Fails if the notifier is missing.
    pub fn interactive(paths: &DataPaths, config: Config) -> Result<Self> {
        paths.ensure_layout()?;
        let notifier = DesktopNotifier::new(config.notifications.clone());
        notifier.check_available()?;

        let mut ctx = Self::with_paths(paths, config, Arc::new(SystemClock));
        ctx.notifier = Arc::new(notifier);
        ctx.display = Arc::new(TerminalDisplay);
        Ok(ctx)
    }

    pub fn ack_parser(&self) -> AckParser {
        AckParser::new(self.tasks.clone(), self.log.clone(), self.queue.clone())
    }
}
