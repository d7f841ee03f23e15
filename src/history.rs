//! Bounded per-session command history.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::backend::ExecOutcome;

/// Default maximum number of records retained per session.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Current wall-clock time as unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One logged command execution with timing, output, and exit status.
///
/// `finished_at`, `exit_code`, and `duration_ms` stay unset while the
/// command is still running on a worker task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Unique within the session, monotonically increasing.
    pub id: u64,
    /// Input text as submitted.
    pub command: String,
    /// Captured standard output, possibly empty.
    pub stdout: String,
    /// Captured standard error, possibly empty.
    pub stderr: String,
    /// Unset while running; 124 is reserved for timeout.
    pub exit_code: Option<i32>,
    /// Unix milliseconds at submission.
    pub started_at: u64,
    /// Unix milliseconds at completion; unset while running.
    pub finished_at: Option<u64>,
    /// `finished_at - started_at`.
    pub duration_ms: Option<u64>,
}

impl CommandRecord {
    /// Create a pending record for a just-submitted command.
    pub fn pending(id: u64, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            started_at: now_ms(),
            finished_at: None,
            duration_ms: None,
        }
    }

    /// Whether the command is still running.
    pub fn is_pending(&self) -> bool {
        self.finished_at.is_none()
    }

    /// Fill in completion fields from an execution outcome.
    pub fn complete(&mut self, outcome: &ExecOutcome, finished_at: u64) {
        self.stdout = outcome.stdout.clone();
        self.stderr = outcome.stderr.clone();
        self.exit_code = Some(outcome.exit_code);
        self.finished_at = Some(finished_at);
        self.duration_ms = Some(finished_at.saturating_sub(self.started_at));
    }
}

/// Bounded, ordered log of command executions for one session.
///
/// Eviction is FIFO on insertion order: once the capacity is exceeded the
/// oldest records are dropped, regardless of access. Concurrent access is
/// guarded by the registry lock; this type itself is single-threaded.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    records: VecDeque<CommandRecord>,
    capacity: usize,
}

impl CommandHistory {
    /// Create an empty history with the given capacity bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, evicting the oldest entries beyond capacity.
    pub fn append(&mut self, record: CommandRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Mutate the most recently appended record in place.
    ///
    /// The expected record id must match; a mismatch means submission and
    /// completion order diverged and the update is refused.
    pub fn update_last<F>(&mut self, expected_id: u64, f: F) -> Option<&CommandRecord>
    where
        F: FnOnce(&mut CommandRecord),
    {
        let last = self.records.back_mut()?;
        if last.id != expected_id {
            return None;
        }
        f(last);
        Some(&*last)
    }

    /// Ordered copy of all records, oldest first.
    pub fn snapshot(&self) -> Vec<CommandRecord> {
        self.records.iter().cloned().collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(code: i32) -> ExecOutcome {
        ExecOutcome {
            stdout: "out".into(),
            stderr: String::new(),
            exit_code: code,
        }
    }

    #[test]
    fn test_append_and_snapshot() {
        let mut history = CommandHistory::with_capacity(10);
        history.append(CommandRecord::pending(1, "ls"));
        history.append(CommandRecord::pending(2, "pwd"));

        let snap = history.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].command, "ls");
        assert_eq!(snap[1].command, "pwd");
    }

    #[test]
    fn test_fifo_eviction() {
        let mut history = CommandHistory::with_capacity(3);
        for i in 1..=5u64 {
            history.append(CommandRecord::pending(i, format!("cmd{}", i)));
        }

        assert_eq!(history.len(), 3);
        let snap = history.snapshot();
        // Oldest two evicted
        assert_eq!(snap[0].id, 3);
        assert_eq!(snap[2].id, 5);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut history = CommandHistory::with_capacity(200);
        for i in 0..500u64 {
            history.append(CommandRecord::pending(i, "x"));
            assert!(history.len() <= 200);
        }
        assert_eq!(history.len(), 200);
    }

    #[test]
    fn test_update_last_matching_id() {
        let mut history = CommandHistory::with_capacity(10);
        history.append(CommandRecord::pending(7, "echo hi"));

        let finished = now_ms() + 5;
        let updated = history.update_last(7, |r| r.complete(&outcome(0), finished));
        assert!(updated.is_some());

        let snap = history.snapshot();
        assert_eq!(snap[0].exit_code, Some(0));
        assert_eq!(snap[0].finished_at, Some(finished));
        assert!(!snap[0].is_pending());
    }

    #[test]
    fn test_update_last_id_mismatch_refused() {
        let mut history = CommandHistory::with_capacity(10);
        history.append(CommandRecord::pending(1, "first"));
        history.append(CommandRecord::pending(2, "second"));

        assert!(history
            .update_last(1, |r| r.complete(&outcome(0), now_ms()))
            .is_none());
        // Second record untouched
        assert!(history.snapshot()[1].is_pending());
    }

    #[test]
    fn test_update_last_empty() {
        let mut history = CommandHistory::default();
        assert!(history.update_last(1, |_| {}).is_none());
    }

    #[test]
    fn test_duration_invariants() {
        let mut record = CommandRecord::pending(1, "sleep 0");
        let finished = record.started_at + 42;
        record.complete(&outcome(0), finished);

        let finished_at = record.finished_at.unwrap();
        assert!(finished_at >= record.started_at);
        assert_eq!(record.duration_ms, Some(finished_at - record.started_at));
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut history = CommandHistory::with_capacity(10);
        history.append(CommandRecord::pending(1, "ls"));

        let a = history.snapshot();
        let b = history.snapshot();
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].command, b[0].command);
    }

    #[test]
    fn test_record_serializes() {
        let record = CommandRecord::pending(3, "uptime");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":3"));
        assert!(json.contains("\"uptime\""));
        assert!(json.contains("\"exit_code\":null"));
    }
}
