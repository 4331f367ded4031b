// ABOUTME: In-memory registry of active executions, so Cancel(executionId) and the stale-directory
// ABOUTME: sweep both know which execution ids currently have a pipeline running

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use runsafe_core::types::ExecutionSession;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<ExecutionSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: ExecutionSession) -> Arc<Mutex<ExecutionSession>> {
        let id = session.execution_id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.lock().unwrap().insert(id, handle.clone());
        handle
    }

    pub fn deregister(&self, execution_id: &str) {
        self.sessions.lock().unwrap().remove(execution_id);
    }

    /// Triggers the session-scoped cancel source for a running execution.
    /// Returns `false` if no session with this id is currently registered,
    /// which is not an error: the execution may already have finished.
    pub fn cancel(&self, execution_id: &str) -> bool {
        match self.sessions.lock().unwrap().get(execution_id) {
            Some(session) => {
                session.lock().unwrap().cancel.cancel_session();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every execution currently registered, used to tell apart a
    /// genuinely stale execution directory from one still in flight.
    pub fn active_ids(&self) -> HashSet<String> {
        self.sessions.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use runsafe_core::CancelHandle;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn sample_session(id: &str) -> ExecutionSession {
        ExecutionSession::new(
            id.to_string(),
            "v1".to_string(),
            std::path::PathBuf::from("/tmp/exec-root"),
            std::path::PathBuf::from("/tmp/exec-root/project"),
            CancelHandle::new(CancellationToken::new(), None),
        )
    }

    #[test]
    fn register_then_deregister_round_trips_through_len() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        registry.register(sample_session("exec-1"));
        assert_eq!(registry.len(), 1);
        assert!(registry.active_ids().contains("exec-1"));

        registry.deregister("exec-1");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancel_fires_the_session_handle_and_returns_true_when_found() {
        let registry = SessionRegistry::new();
        let session = sample_session("exec-2");
        let cancel = session.cancel.clone();
        registry.register(session);

        assert!(registry.cancel("exec-2"));
        tokio::time::timeout(Duration::from_secs(1), cancel.cancelled())
            .await
            .expect("cancel should have fired the registered session's handle");
    }

    #[test]
    fn cancel_on_an_unknown_id_returns_false() {
        let registry = SessionRegistry::new();
        assert!(!registry.cancel("does-not-exist"));
    }
}
