/// Service layer for terminal sessions
///
/// `TerminalSession` binds one shell to one client, `SessionFactory` creates it
/// lazily per connection and `MessageHandler` routes client frames to it.
mod error;
mod message_handler;
mod session_factory;
mod session_handler;
mod terminal_session;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public types and functions
pub use error::SessionError;
pub use message_handler::MessageHandler;
pub use session_factory::{FactoryState, SessionFactory};
pub use session_handler::handle_terminal_session;
pub use terminal_session::{TerminalSession, exit_code};
