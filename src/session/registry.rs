//! Session storage and ownership.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Instant;

use super::{SessionId, SessionStatus};
use crate::error::ConsoleError;
use crate::history::{CommandHistory, CommandRecord};
use crate::Result;

/// One connected client's console session.
///
/// Mutated from the dispatch path (submitting commands, special commands)
/// and from worker tasks filling in completion fields. All mutation goes
/// through [`SessionRegistry::update`] under the registry lock.
#[derive(Debug)]
pub struct Session {
    /// Connection identity, unique key in the registry.
    pub id: SessionId,
    /// Shell target: container name, host alias, or "local".
    pub target: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Bounded command log.
    pub history: CommandHistory,
    /// Inputs queued while a command is executing.
    pub queue: VecDeque<String>,
    /// Whether a worker task is currently running a command.
    pub executing: bool,
    next_command_id: u64,
    /// Time when session was created.
    pub created_at: Instant,
    /// Time of last activity.
    pub last_activity: Instant,
}

impl Session {
    /// Create a new session bound to a target.
    pub fn new(id: SessionId, target: impl Into<String>, history_capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            id,
            target: target.into(),
            status: SessionStatus::Connecting,
            history: CommandHistory::with_capacity(history_capacity),
            queue: VecDeque::new(),
            executing: false,
            next_command_id: 1,
            created_at: now,
            last_activity: now,
        }
    }

    /// Update the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Get the idle duration since last activity.
    pub fn idle_duration(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    /// Append a pending record for a just-submitted command.
    ///
    /// Returns a copy of the record for event emission.
    pub fn begin_command(&mut self, command: impl Into<String>) -> CommandRecord {
        let id = self.next_command_id;
        self.next_command_id += 1;
        let record = CommandRecord::pending(id, command);
        self.history.append(record.clone());
        self.touch();
        record
    }

    /// Fill in completion fields on the most recent record.
    ///
    /// Returns the completed record, or `None` if the record id no longer
    /// matches the last entry (completion and submission order diverged).
    pub fn finish_command(
        &mut self,
        record_id: u64,
        outcome: &crate::backend::ExecOutcome,
        finished_at: u64,
    ) -> Option<CommandRecord> {
        self.touch();
        self.history
            .update_last(record_id, |r| r.complete(outcome, finished_at))
            .cloned()
    }

    /// Apply a status transition, ignoring a same-status no-op.
    pub fn set_status(&mut self, status: SessionStatus) -> Result<()> {
        if self.status == status {
            return Ok(());
        }
        self.status.transition_to(status)
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            target: self.target.clone(),
            status: self.status,
            history: self.history.clone(),
            queue: self.queue.clone(),
            executing: self.executing,
            next_command_id: self.next_command_id,
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

/// Thread-safe map from connection identity to session state.
///
/// The registry exclusively owns all sessions; removal on disconnect is the
/// only required cleanup. Safe for concurrent insert/remove/lookup from the
/// dispatch path and from worker-task completion callbacks.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session under an externally assigned connection id.
    pub fn register(
        &self,
        id: SessionId,
        target: impl Into<String>,
        history_capacity: usize,
    ) -> Result<()> {
        let session = Session::new(id, target, history_capacity);
        let mut sessions = self.sessions.write().map_err(|_| ConsoleError::LockPoisoned)?;
        sessions.insert(id, session);
        Ok(())
    }

    /// Get a clone of the session with the given ID.
    pub fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    /// Check if a session exists.
    pub fn contains(&self, id: &SessionId) -> Result<bool> {
        let sessions = self.sessions.read().map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.contains_key(id))
    }

    /// Update a session using a closure, returning the closure's value.
    ///
    /// Returns `SessionNotFound` if the session doesn't exist, which is how
    /// workers finishing after disconnect detect that their result must be
    /// discarded.
    pub fn update<F, R>(&self, id: &SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().map_err(|_| ConsoleError::LockPoisoned)?;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ConsoleError::SessionNotFound(id.to_string()))?;
        Ok(f(session))
    }

    /// Remove a session from the registry.
    ///
    /// Returns the removed session, or None if it didn't exist.
    pub fn remove(&self, id: &SessionId) -> Result<Option<Session>> {
        let mut sessions = self.sessions.write().map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.remove(id))
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// List all session IDs.
    pub fn list_ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self.sessions.read().map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.keys().copied().collect())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ExecOutcome;
    use crate::history::now_ms;

    fn registry_with_session(target: &str) -> (SessionRegistry, SessionId) {
        let registry = SessionRegistry::new();
        let id = SessionId::new();
        registry.register(id, target, 200).unwrap();
        (registry, id)
    }

    #[test]
    fn test_register_and_get() {
        let (registry, id) = registry_with_session("web1");

        let session = registry.get(&id).unwrap().unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.target, "web1");
        assert_eq!(session.status, SessionStatus::Connecting);
        assert!(session.history.is_empty());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let registry = SessionRegistry::new();
        let fake = SessionId::from_raw(999_999);
        assert!(registry.get(&fake).unwrap().is_none());
    }

    #[test]
    fn test_update_returns_value() {
        let (registry, id) = registry_with_session("web1");

        let record = registry.update(&id, |s| s.begin_command("echo hi")).unwrap();
        assert_eq!(record.id, 1);
        assert!(record.is_pending());

        let session = registry.get(&id).unwrap().unwrap();
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_update_nonexistent() {
        let registry = SessionRegistry::new();
        let fake = SessionId::from_raw(999_999);
        let result = registry.update(&fake, |_| {});
        assert!(matches!(result, Err(ConsoleError::SessionNotFound(_))));
    }

    #[test]
    fn test_command_ids_monotonic() {
        let (registry, id) = registry_with_session("web1");

        let a = registry.update(&id, |s| s.begin_command("a")).unwrap();
        let b = registry.update(&id, |s| s.begin_command("b")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_finish_command() {
        let (registry, id) = registry_with_session("web1");
        let record = registry.update(&id, |s| s.begin_command("echo hi")).unwrap();

        let outcome = ExecOutcome {
            stdout: "hi\n".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        let finished = now_ms();
        let completed = registry
            .update(&id, |s| s.finish_command(record.id, &outcome, finished))
            .unwrap()
            .unwrap();

        assert_eq!(completed.exit_code, Some(0));
        assert_eq!(completed.stdout, "hi\n");
        assert!(completed.finished_at.unwrap() >= completed.started_at);
    }

    #[test]
    fn test_remove_session() {
        let (registry, id) = registry_with_session("web1");

        let removed = registry.remove(&id).unwrap();
        assert!(removed.is_some());
        assert!(!registry.contains(&id).unwrap());
        assert_eq!(registry.count(), 0);

        // Second removal is a no-op, not a fault
        assert!(registry.remove(&id).unwrap().is_none());
    }

    #[test]
    fn test_completion_after_removal_is_detected() {
        let (registry, id) = registry_with_session("web1");
        let record = registry.update(&id, |s| s.begin_command("sleep 60")).unwrap();
        registry.remove(&id).unwrap();

        let outcome = ExecOutcome::failure("gone");
        let result = registry.update(&id, |s| s.finish_command(record.id, &outcome, now_ms()));
        assert!(matches!(result, Err(ConsoleError::SessionNotFound(_))));
    }

    #[test]
    fn test_list_ids() {
        let registry = SessionRegistry::new();
        let a = SessionId::new();
        let b = SessionId::new();
        registry.register(a, "web1", 10).unwrap();
        registry.register(b, "web2", 10).unwrap();

        let ids = registry.list_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }

    #[test]
    fn test_set_status_noop_and_transition() {
        let (registry, id) = registry_with_session("web1");

        registry
            .update(&id, |s| s.set_status(SessionStatus::Ready))
            .unwrap()
            .unwrap();
        // Same-status set is a silent no-op
        registry
            .update(&id, |s| s.set_status(SessionStatus::Ready))
            .unwrap()
            .unwrap();

        let err = registry
            .update(&id, |s| s.set_status(SessionStatus::Connecting))
            .unwrap();
        assert!(err.is_err());
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SessionRegistry::new());
        let mut handles = vec![];

        for _ in 0..100 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                let id = SessionId::new();
                registry.register(id, "web1", 10).unwrap();
                id
            }));
        }

        let ids: Vec<SessionId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 100);
        assert_eq!(registry.count(), 100);
    }
}
