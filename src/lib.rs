//! rs_tty: an interactive shell in a pseudo-terminal, served over WebSocket.
pub mod api;
pub mod app_state;
pub mod config;
pub mod handlers;
pub mod protocol;
pub mod pty;
pub mod server;
pub mod service;
