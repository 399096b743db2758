/// Protocol abstraction for rs_tty
mod connection;
mod frame;
mod websocket_connection;

pub use connection::{
    ClientSink, ConnectionError, ConnectionResult, TerminalConnection, TerminalMessage,
};
pub use frame::{
    CMD_INPUT, CMD_RESIZE, ClientFrame, ControlMessage, ServerNotice, closing_notification,
};
pub use websocket_connection::{WebSocketConnection, WebSocketSink};
