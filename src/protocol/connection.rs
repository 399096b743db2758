/// Connection traits for abstracting the client transport
use std::fmt::Debug;

use bytes::Bytes;
use thiserror::Error;

/// 连接错误类型
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket 错误
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 消息序列化错误
    #[error("Message serialization error: {0}")]
    Serialization(String),
}

/// 连接结果类型
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Outbound half of a client connection.
///
/// Shared between the connection loop and the pumps of the session it owns, so
/// every method takes `&self`.
#[async_trait::async_trait]
pub trait ClientSink: Send + Sync + Debug {
    /// Send a binary frame
    async fn send_binary(&self, data: Bytes) -> ConnectionResult<()>;

    /// Send a text frame
    async fn send_text(&self, message: String) -> ConnectionResult<()>;

    /// Close the connection
    async fn close(&self) -> ConnectionResult<()>;
}

/// Inbound half of a client connection
#[async_trait::async_trait]
pub trait TerminalConnection: Send + Debug {
    /// Receive a message from the connection
    /// Returns None when the connection is closed
    async fn receive(&mut self) -> Option<ConnectionResult<TerminalMessage>>;

    /// Get the connection ID
    fn id(&self) -> &str;

    /// Outbound half of this connection
    fn sink(&self) -> std::sync::Arc<dyn ClientSink>;
}

/// Terminal message types
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalMessage {
    /// Text message (control channel)
    Text(String),
    /// Binary message (data channel)
    Binary(Bytes),
    /// Ping message
    Ping(Bytes),
    /// Pong message
    Pong,
    /// Close message
    Close,
}
