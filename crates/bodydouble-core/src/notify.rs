//! Desktop notification side channel.
//!
//! Delivery is fire-and-forget: a failed notification is logged and the
//! session carries on. The only hard requirement is that the notification
//! command exists at startup.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::storage::NotificationsConfig;

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Sends notifications through `notify-send` (or the configured command).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    config: NotificationsConfig,
}

impl DesktopNotifier {
    pub fn new(config: NotificationsConfig) -> Self {
        Self { config }
    }

    /// Fails when notifications are enabled but the command is not on PATH.
    pub fn check_available(&self) -> Result<()> {
        if !self.config.enabled || find_in_path(&self.config.command).is_some() {
            return Ok(());
        }
        Err(CoreError::NotifierUnavailable {
            command: self.config.command.clone(),
        })
    }

    fn args(&self, title: &str, body: &str) -> Vec<String> {
        let mut args = Vec::new();
        if !self.config.sound.is_empty() {
            args.push("-h".to_string());
            args.push(format!("string:sound-name:{}", self.config.sound));
        }
        args.push(title.to_string());
        args.push(body.to_string());
        args
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, event: &Event) {
        if !self.config.enabled || event.is_quiet() {
            return;
        }
        let title = event.title();
        let body = event.body();
        debug!(%title, %body, "sending notification");

        let command = self.config.command.clone();
        let args = self.args(&title, &body);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match tokio::process::Command::new(&command).args(&args).output().await {
                        Ok(out) if !out.status.success() => warn!(
                            command = %command,
                            stderr = %String::from_utf8_lossy(&out.stderr),
                            "notification failed"
                        ),
                        Ok(_) => {}
                        Err(e) => warn!(command = %command, error = %e, "notification failed"),
                    }
                });
            }
            Err(_) => {
                if let Err(e) = std::process::Command::new(&command).args(&args).output() {
                    warn!(command = %command, error = %e, "notification failed");
                }
            }
        }
    }
}

/// Drops everything. Used when notifications are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) {}
}

/// Keeps every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

fn find_in_path(command: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(command);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(command))
        .find(|full| full.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_sound_hint() {
        let notifier = DesktopNotifier::new(NotificationsConfig::default());
        assert_eq!(
            notifier.args("Pomodoro", "Work session complete!"),
            vec![
                "-h".to_string(),
                "string:sound-name:message-new-instant".to_string(),
                "Pomodoro".to_string(),
                "Work session complete!".to_string(),
            ]
        );
    }

    #[test]
    fn missing_command_is_fatal() {
        let notifier = DesktopNotifier::new(NotificationsConfig {
            command: "definitely-not-a-real-notifier-binary".into(),
            ..NotificationsConfig::default()
        });
        assert!(matches!(
            notifier.check_available(),
            Err(CoreError::NotifierUnavailable { .. })
        ));
    }

    #[test]
    fn disabled_notifier_skips_check() {
        let notifier = DesktopNotifier::new(NotificationsConfig {
            enabled: false,
            command: "definitely-not-a-real-notifier-binary".into(),
            ..NotificationsConfig::default()
        });
        assert!(notifier.check_available().is_ok());
    }
}
