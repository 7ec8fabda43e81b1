//! Background meeting monitor.
//!
//! Polls the session's meeting list for the whole life of a session and
//! queues a `meeting_warning` prompt each time a meeting crosses one of the
//! configured minute thresholds. It only reads the session; the phase loop
//! never waits on it.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::SessionContext;
use crate::error::Result;
use crate::events::Event;
use crate::orchestrator::prompts;
use crate::queue::kinds;

pub struct MeetingMonitor {
    ctx: SessionContext,
    /// Thresholds already warned about, per meeting name.
    fired: HashMap<String, BTreeSet<u32>>,
}

impl MeetingMonitor {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            fired: HashMap::new(),
        }
    }

    pub fn fired(&self, meeting: &str) -> Option<&BTreeSet<u32>> {
        self.fired.get(meeting)
    }

    /// One pass over the meeting list. Returns how many warnings were queued.
    ///
    /// For each upcoming meeting only the smallest crossed threshold is
    /// warned about, and every threshold at or above it is marked fired, so
    /// a meeting first seen 10 minutes out yields one 15-minute warning and
    /// no stale 60/30-minute ones. A warning that cannot be queued is not
    /// marked and is retried on the next scan.
    pub fn scan(&mut self) -> Result<usize> {
        let session = self.ctx.sessions.load()?;
        let now = self.ctx.clock.now();
        let thresholds = &self.ctx.config.meetings.warning_thresholds;
        let mut warned = 0;

        for meeting in &session.meetings {
            if session.completed_items.contains(&meeting.name) {
                continue;
            }
            let Some(minutes_until) = meeting.minutes_until(now) else {
                warn!(meeting = %meeting.name, start = %meeting.start_time, "unparseable meeting time");
                continue;
            };
            if minutes_until <= 0.0 {
                continue;
            }

            let Some(crossed) = thresholds
                .iter()
                .copied()
                .filter(|&t| minutes_until <= f64::from(t))
                .min()
            else {
                continue;
            };

            if self.fired.get(&meeting.name).is_some_and(|f| f.contains(&crossed)) {
                continue;
            }

            let minutes = minutes_until.ceil() as u32;
            if let Err(e) = self.ctx.queue.append(
                kinds::MEETING_WARNING,
                &prompts::meeting_warning(&meeting.name, minutes, &meeting.start_time),
            ) {
                warn!(meeting = %meeting.name, error = %e, "could not queue meeting warning; will retry");
                continue;
            }
            info!(meeting = %meeting.name, threshold = crossed, minutes, "meeting warning");
            self.fired
                .entry(meeting.name.clone())
                .or_default()
                .extend(thresholds.iter().copied().filter(|&t| t >= crossed));
            self.ctx.notifier.notify(&Event::MeetingWarning {
                meeting: meeting.name.clone(),
                threshold_minutes: crossed,
                minutes_until: minutes,
                at: now,
            });
            warned += 1;
        }
        Ok(warned)
    }

    /// Scan, sleep, repeat until `cancel` fires. A failed scan is logged and
    /// the loop carries on.
    pub async fn run(mut self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.ctx.config.meetings.poll_interval_seconds.max(1));
        let clock = self.ctx.clock.clone();
        debug!(?interval, "meeting monitor started");
        loop {
            if let Err(e) = self.scan() {
                warn!(error = %e, "meeting scan failed");
            }
            tokio::select! {
                _ = clock.sleep(interval) => {}
                _ = cancel.cancelled() => {
                    debug!("meeting monitor shutting down");
                    break;
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::RecordingNotifier;
    use crate::session::{Meeting, MemorySessionStore, Session};
    use crate::storage::{format_local_time, Config, DataPaths};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        monitor: MeetingMonitor,
    }

    fn fixture(meetings: &[(&str, i64)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(nine_am()));
        let mut ctx =
            SessionContext::with_paths(&DataPaths::new(dir.path()), Config::default(), clock.clone());
        let session = Session {
            meetings: meetings
                .iter()
                .map(|(name, minutes)| Meeting {
                    name: name.to_string(),
                    start_time: format_local_time(nine_am() + chrono::Duration::minutes(*minutes)),
                })
                .collect(),
            ..Session::default()
        };
        ctx.sessions = Arc::new(MemorySessionStore::new(session));
        let notifier = Arc::new(RecordingNotifier::default());
        ctx.notifier = notifier.clone();
        Fixture {
            _dir: dir,
            clock,
            notifier,
            monitor: MeetingMonitor::new(ctx),
        }
    }

    #[test]
    fn first_seen_inside_small_window_fires_once() {
        let mut f = fixture(&[("Standup", 10)]);
        assert_eq!(f.monitor.scan().unwrap(), 1);

        let fired = f.monitor.fired("Standup").unwrap();
        assert_eq!(fired.iter().copied().collect::<Vec<_>>(), vec![15, 30, 60]);

        let entries = f.monitor.ctx.queue.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, kinds::MEETING_WARNING);
        assert!(entries[0].prompt.contains("Standup"));
        assert!(matches!(
            f.notifier.events().as_slice(),
            [Event::MeetingWarning { threshold_minutes: 15, minutes_until: 10, .. }]
        ));

        // Same window on the next poll: nothing new.
        f.clock.advance(Duration::from_secs(30));
        assert_eq!(f.monitor.scan().unwrap(), 0);
    }

    #[test]
    fn walks_down_the_thresholds() {
        let mut f = fixture(&[("Review", 70)]);
        assert_eq!(f.monitor.scan().unwrap(), 0);

        let mut total = 0;
        for _ in 0..(70 * 2) {
            f.clock.advance(Duration::from_secs(30));
            total += f.monitor.scan().unwrap();
        }
        assert_eq!(total, 4);
        let thresholds: Vec<u32> = f
            .notifier
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::MeetingWarning { threshold_minutes, .. } => Some(*threshold_minutes),
                _ => None,
            })
            .collect();
        assert_eq!(thresholds, vec![60, 30, 15, 5]);
    }

    #[test]
    fn skips_completed_past_and_unparseable_meetings() {
        let mut f = fixture(&[("Done", 10), ("Past", -5)]);
        f.monitor
            .ctx
            .sessions
            .update(&mut |s| {
                s.completed_items.insert("Done".into());
                s.meetings.push(Meeting {
                    name: "Garbled".into(),
                    start_time: "half past never".into(),
                });
            })
            .unwrap();
        assert_eq!(f.monitor.scan().unwrap(), 0);
        assert!(f.monitor.ctx.queue.entries().unwrap().is_empty());
    }

    #[test]
    fn unqueued_warning_is_retried_next_scan() {
        let mut f = fixture(&[("Standup", 10), ("Review", 25)]);
        let queue_path = f.monitor.ctx.queue.path().to_path_buf();
        std::fs::write(&queue_path, "[{not json").unwrap();

        assert_eq!(f.monitor.scan().unwrap(), 0);
        assert!(f.monitor.fired("Standup").is_none());
        assert!(f.monitor.fired("Review").is_none());
        assert!(f.notifier.events().is_empty());

        std::fs::remove_file(&queue_path).unwrap();
        f.clock.advance(Duration::from_secs(30));
        assert_eq!(f.monitor.scan().unwrap(), 2);
        let entries = f.monitor.ctx.queue.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == kinds::MEETING_WARNING));
    }

    #[tokio::test]
    async fn spawned_loop_stops_on_cancel() {
        let f = fixture(&[("Standup", 3)]);
        let queue = f.monitor.ctx.queue.clone();
        let cancel = CancellationToken::new();
        let handle = f.monitor.spawn(cancel.clone());

        tokio::task::yield_now().await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(queue.entries().unwrap().len(), 1);
    }
}
