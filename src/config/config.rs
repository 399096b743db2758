/// Configuration data structures for rs_tty
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::pty::WindowSize;

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP/WebSocket listener settings
    pub server: ListenConfig,

    /// Shell launched for every connection
    pub shell: ShellConfig,

    /// Session lifecycle tuning
    pub session: SessionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ListenConfig {
    /// Address to bind
    pub address: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Shell configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell executable path
    pub command: String,

    /// Extra arguments passed to the shell
    pub args: Vec<String>,

    /// Working directory (inherits the server's when unset)
    pub working_directory: Option<PathBuf>,

    /// Extra environment variables; TERM and COLORTERM are always forced
    pub environment: HashMap<String, String>,

    /// Window size applied when the PTY is allocated
    pub initial_size: WindowSize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: "/bin/sh".to_string(),
            args: Vec::new(),
            working_directory: None,
            environment: HashMap::new(),
            initial_size: WindowSize::default(),
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// How long `close()` waits for a killed shell to exit, in milliseconds
    pub kill_timeout_ms: u64,

    /// Upper bound of a single PTY read
    pub read_chunk_size: usize,
}

impl SessionConfig {
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kill_timeout_ms: 5_000,
            read_chunk_size: 20 * 1024,
        }
    }
}

/// Log output format
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
