/// Application state shared by the HTTP handlers
use std::sync::Arc;

use crate::app_state::SessionRegistry;
use crate::config::ServerConfig;
use crate::pty::{NativePtyFactory, PtyConfig, PtyFactory};

/// Application state containing shared data across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<ServerConfig>,
    /// Live terminal sessions, closed together on shutdown
    pub registry: SessionRegistry,
    /// Creates the PTY and shell for each new session
    pub pty_factory: Arc<dyn PtyFactory>,
    /// Shell launch settings resolved once from the configuration
    pub pty_config: Arc<PtyConfig>,
}

impl AppState {
    /// Create a new instance of AppState with configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_pty_factory(config, Arc::new(NativePtyFactory))
    }

    pub fn with_pty_factory(config: ServerConfig, pty_factory: Arc<dyn PtyFactory>) -> Self {
        let pty_config = PtyConfig::from_shell(&config.shell);
        Self {
            config: Arc::new(config),
            registry: SessionRegistry::new(),
            pty_factory,
            pty_config: Arc::new(pty_config),
        }
    }

    /// Get the number of active sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }
}
