//! Session repository backends
//!
//! The StateManager actor is the only caller, so implementations need no
//! internal locking.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{SessionId, WorkflowState};

/// Storage backend for workflow state
pub trait SessionRepository: Send + 'static {
    /// Load one session, `None` if unknown
    fn load(&self, session_id: &SessionId) -> eyre::Result<Option<WorkflowState>>;

    /// Insert or replace a session
    fn save(&mut self, state: WorkflowState) -> eyre::Result<()>;

    /// All sessions, in session-id order
    fn list(&self) -> eyre::Result<Vec<WorkflowState>>;

    /// Release resources; called once on shutdown
    fn close(&mut self) -> eyre::Result<()> {
        Ok(())
    }
}

/// In-process repository; state lives for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryRepository {
    sessions: HashMap<SessionId, WorkflowState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionRepository for MemoryRepository {
    fn load(&self, session_id: &SessionId) -> eyre::Result<Option<WorkflowState>> {
        debug!(%session_id, "MemoryRepository::load: called");
        Ok(self.sessions.get(session_id).cloned())
    }

    fn save(&mut self, state: WorkflowState) -> eyre::Result<()> {
        debug!(session_id = %state.session_id, "MemoryRepository::save: called");
        self.sessions.insert(state.session_id.clone(), state);
        Ok(())
    }

    fn list(&self) -> eyre::Result<Vec<WorkflowState>> {
        debug!(count = self.sessions.len(), "MemoryRepository::list: called");
        let mut all: Vec<WorkflowState> = self.sessions.values().cloned().collect();
        all.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(all)
    }

    fn close(&mut self) -> eyre::Result<()> {
        debug!(count = self.sessions.len(), "MemoryRepository::close: called");
        self.sessions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_repository_roundtrip() {
        let mut repo = MemoryRepository::new();
        let state = WorkflowState::new(SessionId::generate(), "u1", "smart parking");
        let id = state.session_id.clone();

        repo.save(state.clone()).unwrap();
        assert_eq!(repo.load(&id).unwrap(), Some(state));
        assert!(repo.load(&SessionId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_list_is_sorted_by_id() {
        let mut repo = MemoryRepository::new();
        for _ in 0..5 {
            repo.save(WorkflowState::new(SessionId::generate(), "u1", "x")).unwrap();
        }
        let ids: Vec<SessionId> = repo.list().unwrap().into_iter().map(|s| s.session_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_close_clears() {
        let mut repo = MemoryRepository::new();
        repo.save(WorkflowState::new(SessionId::generate(), "u1", "x")).unwrap();
        repo.close().unwrap();
        assert!(repo.is_empty());
    }
}
