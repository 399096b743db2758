/// Per-connection lazy creation of the terminal session
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::app_state::SessionRegistry;
use crate::config::SessionConfig;
use crate::protocol::ClientSink;
use crate::pty::{PtyConfig, PtyFactory};
use crate::service::{SessionError, TerminalSession};

/// Lifecycle of the session owned by one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryState {
    Absent,
    Creating,
    Ready,
    Closed,
}

struct Slot {
    state: FactoryState,
    session: Option<Arc<TerminalSession>>,
}

/// Creates at most one [`TerminalSession`] per client connection.
///
/// The slot mutex doubles as the creation lock: it is held while the PTY is
/// allocated and the shell spawned, so messages racing in before the first
/// session is ready all end up with that same session.
pub struct SessionFactory {
    connection_id: String,
    pty_factory: Arc<dyn PtyFactory>,
    pty_config: Arc<PtyConfig>,
    session_config: SessionConfig,
    registry: SessionRegistry,
    sink: Arc<dyn ClientSink>,
    slot: Mutex<Slot>,
}

impl SessionFactory {
    pub fn new(
        connection_id: String,
        pty_factory: Arc<dyn PtyFactory>,
        pty_config: Arc<PtyConfig>,
        session_config: SessionConfig,
        registry: SessionRegistry,
        sink: Arc<dyn ClientSink>,
    ) -> Self {
        Self {
            connection_id,
            pty_factory,
            pty_config,
            session_config,
            registry,
            sink,
            slot: Mutex::new(Slot {
                state: FactoryState::Absent,
                session: None,
            }),
        }
    }

    pub async fn state(&self) -> FactoryState {
        self.slot.lock().await.state
    }

    /// Return the connection's session, creating it on first use.
    ///
    /// A failed creation leaves the factory `Absent` so a later message can
    /// try again; nothing is registered for the failed attempt.
    pub async fn session(&self) -> Result<Arc<TerminalSession>, SessionError> {
        let mut slot = self.slot.lock().await;
        match (&slot.state, &slot.session) {
            (FactoryState::Ready, Some(session)) => return Ok(session.clone()),
            (FactoryState::Closed, _) => return Err(SessionError::FactoryClosed),
            _ => {}
        }

        slot.state = FactoryState::Creating;
        match self.create().await {
            Ok(session) => {
                slot.session = Some(session.clone());
                slot.state = FactoryState::Ready;
                Ok(session)
            }
            Err(e) => {
                error!(
                    "Failed to create terminal session for connection {}: {}",
                    self.connection_id, e
                );
                slot.state = FactoryState::Absent;
                Err(e)
            }
        }
    }

    async fn create(&self) -> Result<Arc<TerminalSession>, SessionError> {
        let spawned = self.pty_factory.spawn(&self.pty_config).await?;
        let session = TerminalSession::new(
            spawned,
            self.sink.clone(),
            self.registry.clone(),
            &self.session_config,
        );

        // Registered before the monitor runs so a shell that exits at once is
        // still removed afterwards.
        self.registry.add(&session);
        if let Err(e) = session.start() {
            if let Err(close_err) = session.close().await {
                error!("Failed to close half-started session: {}", close_err);
            }
            self.registry.remove(session.id());
            return Err(e);
        }

        info!(
            "Terminal session {} created for connection {} via {}",
            session.id(),
            self.connection_id,
            self.pty_factory.name()
        );
        Ok(session)
    }

    /// Close the connection's session, if any. Further `session()` calls fail.
    pub async fn teardown(&self) {
        let session = {
            let mut slot = self.slot.lock().await;
            slot.state = FactoryState::Closed;
            slot.session.take()
        };
        let Some(session) = session else {
            return;
        };

        info!("Closing terminal for connection {}", self.connection_id);
        let result = session.close().await;
        self.registry.remove(session.id());
        if let Err(e) = result {
            error!(
                "Error closing terminal session {}: {}",
                session.id(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::pty::{NativePtyFactory, PtyError, SpawnedPty};
    use crate::service::test_support::RecordingSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingFactory {
        spawns: AtomicUsize,
    }

    #[async_trait]
    impl PtyFactory for CountingFactory {
        async fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty, PtyError> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            // Widen the race window between concurrent first requests.
            tokio::time::sleep(Duration::from_millis(50)).await;
            NativePtyFactory.spawn(config).await
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl PtyFactory for FailingFactory {
        async fn spawn(&self, _config: &PtyConfig) -> Result<SpawnedPty, PtyError> {
            Err(PtyError::Spawn(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn factory(pty_factory: Arc<dyn PtyFactory>, registry: &SessionRegistry) -> SessionFactory {
        SessionFactory::new(
            "test-connection".to_string(),
            pty_factory,
            Arc::new(PtyConfig::from_shell(&ShellConfig::default())),
            SessionConfig::default(),
            registry.clone(),
            RecordingSink::new(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_requests_spawn_once() {
        let counting = Arc::new(CountingFactory::default());
        let registry = SessionRegistry::new();
        let factory = Arc::new(factory(counting.clone(), &registry));

        let requests: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                tokio::spawn(async move { factory.session().await })
            })
            .collect();
        let sessions: Vec<Arc<TerminalSession>> = futures_util::future::join_all(requests)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(counting.spawns.load(Ordering::SeqCst), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(registry.len(), 1);
        assert_eq!(factory.state().await, FactoryState::Ready);

        factory.teardown().await;
        assert!(registry.is_empty());
        assert!(sessions[0].is_closed());
    }

    #[tokio::test]
    async fn teardown_blocks_new_sessions() {
        let registry = SessionRegistry::new();
        let factory = factory(Arc::new(NativePtyFactory), &registry);

        factory.session().await.unwrap();
        factory.teardown().await;
        factory.teardown().await;

        assert_eq!(factory.state().await, FactoryState::Closed);
        assert!(matches!(
            factory.session().await,
            Err(SessionError::FactoryClosed)
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn teardown_without_session_is_noop() {
        let registry = SessionRegistry::new();
        let factory = factory(Arc::new(NativePtyFactory), &registry);

        factory.teardown().await;
        assert_eq!(factory.state().await, FactoryState::Closed);
    }

    #[tokio::test]
    async fn failed_creation_registers_nothing() {
        let registry = SessionRegistry::new();
        let factory = factory(Arc::new(FailingFactory), &registry);

        let err = factory.session().await.err().unwrap();

        assert!(matches!(err, SessionError::Pty(PtyError::Spawn(_))));
        assert_eq!(factory.state().await, FactoryState::Absent);
        assert!(registry.is_empty());
    }
}
