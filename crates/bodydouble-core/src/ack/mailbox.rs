//! Single-slot ack mailbox with at-most-once consumption.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::storage::atomic_write;

pub trait AckMailbox: Send + Sync {
    /// Consume the pending ack, if any. A consumed ack is never returned twice.
    fn take(&self) -> Result<Option<String>>;

    fn post(&self, content: &str) -> Result<()>;
}

/// `acknowledged.txt`: a non-empty file is a pending ack; taking it deletes it.
/// Bytes that are not UTF-8 are decoded lossily so the parser can answer them.
#[derive(Debug, Clone)]
pub struct FileAckMailbox {
    path: PathBuf,
}

impl FileAckMailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AckMailbox for FileAckMailbox {
    fn take(&self) -> Result<Option<String>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let bytes = std::fs::read(&self.path)?;
        std::fs::remove_file(&self.path)?;
        Ok(Some(String::from_utf8_lossy(&bytes).trim().to_string()))
    }

    fn post(&self, content: &str) -> Result<()> {
        atomic_write(&self.path, content.trim().as_bytes())
    }
}

/// In-process FIFO. Posting several acks queues them in order.
#[derive(Debug, Default)]
pub struct MemoryAckMailbox {
    pending: Mutex<VecDeque<String>>,
}

impl MemoryAckMailbox {
    pub fn with_acks<I, S>(acks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: Mutex::new(acks.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AckMailbox for MemoryAckMailbox {
    fn take(&self) -> Result<Option<String>> {
        Ok(self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front())
    }

    fn post(&self, content: &str) -> Result<()> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(content.trim().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mailbox_consumes_once() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FileAckMailbox::new(dir.path().join("acknowledged.txt"));
        assert_eq!(mailbox.take().unwrap(), None);

        mailbox.post("continue:Writing\n").unwrap();
        assert_eq!(mailbox.take().unwrap().as_deref(), Some("continue:Writing"));
        assert!(!mailbox.path().exists());
        assert_eq!(mailbox.take().unwrap(), None);
    }

    #[test]
    fn file_mailbox_ignores_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FileAckMailbox::new(dir.path().join("acknowledged.txt"));
        std::fs::write(mailbox.path(), "").unwrap();
        assert_eq!(mailbox.take().unwrap(), None);
        assert!(mailbox.path().exists());
    }

    #[test]
    fn file_mailbox_consumes_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FileAckMailbox::new(dir.path().join("acknowledged.txt"));
        std::fs::write(mailbox.path(), [0xff, 0xfe, 0x00]).unwrap();

        let taken = mailbox.take().unwrap().unwrap();
        assert!(taken.starts_with('\u{FFFD}'));
        assert!(!mailbox.path().exists());
        assert_eq!(mailbox.take().unwrap(), None);
    }

    #[test]
    fn memory_mailbox_is_fifo() {
        let mailbox = MemoryAckMailbox::with_acks(["continue", "end"]);
        assert_eq!(mailbox.take().unwrap().as_deref(), Some("continue"));
        mailbox.post("extend").unwrap();
        assert_eq!(mailbox.take().unwrap().as_deref(), Some("end"));
        assert_eq!(mailbox.take().unwrap().as_deref(), Some("extend"));
        assert!(mailbox.is_empty());
    }
}
