/// Error types for the service layer
use thiserror::Error;

use crate::protocol::ConnectionError;
use crate::pty::PtyError;

/// Service layer error type
#[derive(Error, Debug)]
pub enum SessionError {
    /// PTY allocation, spawn or descriptor error
    #[error("PTY error: {0}")]
    Pty(#[from] PtyError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The connection was torn down; no new session may be created for it
    #[error("Connection is closing, terminal session not available")]
    FactoryClosed,

    /// Sending the kill signal to the shell failed
    #[error("Failed to terminate shell process: {0}")]
    KillFailed(#[source] std::io::Error),
}
