//! Prompt queue (`prompt_queue.json`): the agent's mailbox.
//!
//! Entries are appended, never edited by the orchestrator; delivery marking
//! belongs to whatever relays prompts to the agent. Readers take a shared
//! advisory lock and writers an exclusive one on a sidecar `.lock` file, and
//! every write replaces the document atomically, so a reader never observes
//! a half-written array.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::storage::{atomic_write, format_local_time};

/// Prompt type tags.
pub mod kinds {
    pub const SESSION_START: &str = "session_start";
    pub const WORK_COMPLETE: &str = "work_complete";
    pub const BREAK_COMPLETE: &str = "break_complete";
    pub const EXTENSION_COMPLETE: &str = "extension_complete";
    pub const MEETING_WARNING: &str = "meeting_warning";
    pub const END_SESSION_SUGGESTION: &str = "end_session_suggestion";
    pub const ACK_OVERDUE: &str = "ack_overdue";
    pub const ERROR: &str = "error";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: u64,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    #[serde(default)]
    pub delivered: bool,
}

pub struct PromptQueue {
    path: PathBuf,
    lock_path: PathBuf,
    clock: Arc<dyn Clock>,
    /// Highest id handed out by this process. Survives `clear`.
    issued: AtomicU64,
}

struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl PromptQueue {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            clock,
            issued: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?)
    }

    fn shared(&self) -> Result<LockGuard> {
        let file = self.lock_file()?;
        FileExt::lock_shared(&file)?;
        Ok(LockGuard(file))
    }

    fn exclusive(&self) -> Result<LockGuard> {
        let file = self.lock_file()?;
        FileExt::lock_exclusive(&file)?;
        Ok(LockGuard(file))
    }

    fn read_unlocked(&self) -> Result<Vec<QueueEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| CoreError::Decode {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write_unlocked(&self, entries: &[QueueEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        atomic_write(&self.path, json.as_bytes())
    }

    fn push_unlocked(&self, entries: &mut Vec<QueueEntry>, kind: &str, prompt: &str) -> QueueEntry {
        let max_existing = entries.iter().map(|e| e.id).max().unwrap_or(0);
        let id = max_existing.max(self.issued.load(Ordering::SeqCst)) + 1;
        self.issued.fetch_max(id, Ordering::SeqCst);

        let entry = QueueEntry {
            id,
            timestamp: format_local_time(self.clock.now()),
            kind: kind.to_string(),
            prompt: prompt.to_string(),
            delivered: false,
        };
        entries.push(entry.clone());
        entry
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Result<Vec<QueueEntry>> {
        let _guard = self.shared()?;
        self.read_unlocked()
    }

    pub fn pending(&self) -> Result<Vec<QueueEntry>> {
        Ok(self.entries()?.into_iter().filter(|e| !e.delivered).collect())
    }

    pub fn has_undelivered(&self, kind: &str) -> Result<bool> {
        Ok(self.entries()?.iter().any(|e| e.kind == kind && !e.delivered))
    }

    pub fn append(&self, kind: &str, prompt: &str) -> Result<QueueEntry> {
        let _guard = self.exclusive()?;
        let mut entries = self.read_unlocked()?;
        let entry = self.push_unlocked(&mut entries, kind, prompt);
        self.write_unlocked(&entries)?;
        debug!(id = entry.id, kind, "prompt queued");
        Ok(entry)
    }

    /// Append unless an undelivered entry of the same kind is already waiting.
    pub fn append_once(&self, kind: &str, prompt: &str) -> Result<Option<QueueEntry>> {
        let _guard = self.exclusive()?;
        let mut entries = self.read_unlocked()?;
        if entries.iter().any(|e| e.kind == kind && !e.delivered) {
            debug!(kind, "prompt already queued");
            return Ok(None);
        }
        let entry = self.push_unlocked(&mut entries, kind, prompt);
        self.write_unlocked(&entries)?;
        Ok(Some(entry))
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.exclusive()?;
        self.write_unlocked(&[])
    }

    /// Returns false when no entry has this id.
    pub fn mark_delivered(&self, id: u64) -> Result<bool> {
        let _guard = self.exclusive()?;
        let mut entries = self.read_unlocked()?;
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        entry.delivered = true;
        self.write_unlocked(&entries)?;
        Ok(true)
    }

    /// Oldest undelivered entry, marked delivered as it is handed out.
    pub fn take_next(&self) -> Result<Option<QueueEntry>> {
        let _guard = self.exclusive()?;
        let mut entries = self.read_unlocked()?;
        let Some(entry) = entries.iter_mut().find(|e| !e.delivered) else {
            return Ok(None);
        };
        entry.delivered = true;
        let taken = entry.clone();
        self.write_unlocked(&entries)?;
        Ok(Some(taken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn queue(dir: &tempfile::TempDir) -> PromptQueue {
        PromptQueue::new(dir.path().join("prompt_queue.json"), Arc::new(SystemClock))
    }

    #[test]
    fn first_id_is_one() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        assert_eq!(q.append(kinds::ERROR, "oops").unwrap().id, 1);
    }

    #[test]
    fn ids_continue_from_existing_max() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompt_queue.json"),
            r#"[{"id": 41, "timestamp": "2026-03-02T09:00:00", "type": "error", "prompt": "x", "delivered": true}]"#,
        )
        .unwrap();
        let q = queue(&dir);
        assert_eq!(q.append(kinds::WORK_COMPLETE, "done").unwrap().id, 42);
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        q.append(kinds::WORK_COMPLETE, "a").unwrap();
        q.append(kinds::BREAK_COMPLETE, "b").unwrap();
        q.clear().unwrap();
        assert!(q.entries().unwrap().is_empty());
        assert_eq!(q.append(kinds::WORK_COMPLETE, "c").unwrap().id, 3);
    }

    #[test]
    fn append_once_skips_undelivered_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        let first = q.append_once(kinds::END_SESSION_SUGGESTION, "wrap up?").unwrap();
        assert!(first.is_some());
        assert!(q.append_once(kinds::END_SESSION_SUGGESTION, "wrap up?").unwrap().is_none());

        q.mark_delivered(first.unwrap().id).unwrap();
        assert!(q.append_once(kinds::END_SESSION_SUGGESTION, "wrap up?").unwrap().is_some());
    }

    #[test]
    fn take_next_marks_delivered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        q.append(kinds::WORK_COMPLETE, "first").unwrap();
        q.append(kinds::MEETING_WARNING, "second").unwrap();

        assert_eq!(q.take_next().unwrap().unwrap().prompt, "first");
        assert_eq!(q.take_next().unwrap().unwrap().prompt, "second");
        assert!(q.take_next().unwrap().is_none());
        assert!(q.pending().unwrap().is_empty());
        assert_eq!(q.entries().unwrap().len(), 2);
    }

    #[test]
    fn serialized_shape_uses_type_key() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        q.append(kinds::ERROR, "bad ack").unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(q.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["type"], "error");
        assert_eq!(raw[0]["delivered"], false);
    }

    #[test]
    fn mark_delivered_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue(&dir);
        assert!(!q.mark_delivered(7).unwrap());
    }
}
