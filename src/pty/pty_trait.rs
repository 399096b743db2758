use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ShellConfig;
use crate::pty::PtyMaster;

// ================ 配置与错误类型 ================

/// Terminal window size in character cells.
///
/// Fields are named rather than positional so that callers cannot swap rows
/// and columns by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

impl From<WindowSize> for nix::pty::Winsize {
    fn from(size: WindowSize) -> Self {
        nix::pty::Winsize {
            ws_row: size.rows,
            ws_col: size.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

/// Everything needed to launch one shell inside a fresh PTY
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub command: String,
    pub args: Vec<String>,
    pub size: WindowSize,
    /// Added on top of the inherited server environment
    pub env: Vec<(String, String)>,
    pub cwd: Option<std::path::PathBuf>,
}

impl PtyConfig {
    /// Build a launch configuration from the shell section of the server config.
    /// `TERM` and `COLORTERM` always win over configured values.
    pub fn from_shell(shell: &ShellConfig) -> Self {
        let mut env: Vec<(String, String)> = shell
            .environment
            .iter()
            .filter(|(key, _)| key.as_str() != "TERM" && key.as_str() != "COLORTERM")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        env.push(("TERM".to_string(), "xterm-256color".to_string()));
        env.push(("COLORTERM".to_string(), "truecolor".to_string()));

        Self {
            command: shell.command.clone(),
            args: shell.args.clone(),
            size: shell.initial_size,
            env,
            cwd: shell.working_directory.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("Failed to allocate PTY: {0}")]
    Allocation(#[source] std::io::Error),
    #[error("Process spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Resize failed: {0}")]
    Resize(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PTY descriptor already closed")]
    Closed,
    #[error("Background task error: {0}")]
    BackgroundTask(String),
}

// ================ 核心Trait定义 ================

/// A shell attached to the slave side of a PTY, together with the master side
#[derive(Debug)]
pub struct SpawnedPty {
    pub master: PtyMaster,
    pub child: tokio::process::Child,
}

/// PTY工厂Trait
#[async_trait]
pub trait PtyFactory: Send + Sync {
    /// Allocate a PTY pair and launch the configured shell on its slave side
    async fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty, PtyError>;

    /// 工厂名称
    fn name(&self) -> &'static str;
}
