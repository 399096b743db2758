/// Process-wide bookkeeping of live terminal sessions
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use crate::service::SessionError;

/// A session that can be force-closed on server shutdown
#[async_trait]
pub trait RegisteredSession: Send + Sync {
    fn id(&self) -> Uuid;

    async fn close(&self) -> Result<(), SessionError>;
}

/// Set of live sessions.
///
/// Entries are weak: the registry tracks sessions for broadcast shutdown but
/// never keeps one alive.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Weak<dyn RegisteredSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, Weak<dyn RegisteredSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add<S: RegisteredSession + 'static>(&self, session: &Arc<S>) {
        let weak: Weak<dyn RegisteredSession> = Arc::<S>::downgrade(session);
        self.entries().insert(session.id(), weak);
    }

    /// Returns whether the session was present
    pub fn remove(&self, id: Uuid) -> bool {
        self.entries().remove(&id).is_some()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries().contains_key(&id)
    }

    /// Number of tracked sessions that are still alive
    pub fn len(&self) -> usize {
        self.entries()
            .values()
            .filter(|session| session.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot and empty the registry, then close every session that is still
    /// alive. A failure closing one session does not stop the others.
    /// Returns the number of sessions closed without error.
    pub async fn close_all(&self) -> usize {
        let snapshot: Vec<(Uuid, Weak<dyn RegisteredSession>)> = self.entries().drain().collect();
        if snapshot.is_empty() {
            return 0;
        }

        info!("Closing {} terminal session(s)", snapshot.len());
        let mut closed = 0;
        for (id, session) in snapshot {
            let Some(session) = session.upgrade() else {
                continue;
            };
            match session.close().await {
                Ok(()) => closed += 1,
                Err(e) => error!("Error closing terminal session {} on shutdown: {}", id, e),
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSession {
        id: Uuid,
        fail: bool,
        close_calls: AtomicUsize,
    }

    impl FakeSession {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                fail,
                close_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RegisteredSession for FakeSession {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn close(&self) -> Result<(), SessionError> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SessionError::Pty(PtyError::Closed))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn close_all_isolates_failures() {
        let registry = SessionRegistry::new();
        let sessions = [
            FakeSession::new(false),
            FakeSession::new(true),
            FakeSession::new(false),
        ];
        for session in &sessions {
            registry.add(session);
        }
        assert_eq!(registry.len(), 3);

        let closed = registry.close_all().await;

        assert_eq!(closed, 2);
        for session in &sessions {
            assert_eq!(session.close_calls.load(Ordering::SeqCst), 1);
        }
        assert!(registry.is_empty());
        assert!(!registry.contains(sessions[0].id));
    }

    #[tokio::test]
    async fn registry_does_not_keep_sessions_alive() {
        let registry = SessionRegistry::new();
        let session = FakeSession::new(false);
        let id = session.id;
        registry.add(&session);
        drop(session);

        assert!(registry.contains(id));
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.close_all().await, 0);
        assert!(!registry.contains(id));
    }

    #[test]
    fn remove_reports_membership() {
        let registry = SessionRegistry::new();
        let session = FakeSession::new(false);
        registry.add(&session);

        assert!(registry.remove(session.id));
        assert!(!registry.remove(session.id));
    }
}
