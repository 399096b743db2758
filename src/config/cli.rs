/// Command line interface for rs_tty
use std::path::PathBuf;

use clap::Parser;

use crate::config::{LogFormat, ServerConfig};

/// Expose a shell running in a pseudo-terminal over WebSocket
#[derive(Debug, Parser, Default)]
#[command(name = "rs_tty", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "RS_TTY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    pub address: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Shell executable launched for each connection
    #[arg(short, long)]
    pub shell: Option<String>,

    /// Log filter directive, e.g. "info" or "rs_tty=debug"
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply command line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(shell) = &self.shell {
            config.shell.command = shell.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}
