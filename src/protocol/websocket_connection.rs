/// WebSocket implementation of the connection traits
use std::fmt::Debug;
use std::sync::Arc;

use axum::extract::ws::Message::{Binary, Close, Ping, Pong, Text};
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

use crate::protocol::{
    ClientSink, ConnectionError, ConnectionResult, TerminalConnection, TerminalMessage,
};

/// Inbound half of an upgraded WebSocket
pub struct WebSocketConnection {
    id: String,
    stream: SplitStream<WebSocket>,
    sink: Arc<WebSocketSink>,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, id: String) -> Self {
        let (sink, stream) = socket.split();
        Self {
            id,
            stream,
            sink: Arc::new(WebSocketSink {
                sink: Mutex::new(sink),
            }),
        }
    }
}

impl Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("id", &self.id)
            .finish()
    }
}

#[async_trait::async_trait]
impl TerminalConnection for WebSocketConnection {
    async fn receive(&mut self) -> Option<ConnectionResult<TerminalMessage>> {
        match self.stream.next().await {
            Some(Ok(Text(text))) => {
                debug!("WebSocket received text message: {:?}", text);
                Some(Ok(TerminalMessage::Text(text)))
            }
            Some(Ok(Binary(bin))) => {
                trace!("WebSocket received binary message, length: {}", bin.len());
                Some(Ok(TerminalMessage::Binary(Bytes::from(bin))))
            }
            Some(Ok(Ping(ping))) => {
                debug!("WebSocket received ping message");
                Some(Ok(TerminalMessage::Ping(Bytes::from(ping))))
            }
            Some(Ok(Pong(_pong))) => {
                debug!("WebSocket received pong message");
                Some(Ok(TerminalMessage::Pong))
            }
            Some(Ok(Close(_))) => {
                debug!("WebSocket received close message");
                Some(Ok(TerminalMessage::Close))
            }
            Some(Err(e)) => {
                error!("WebSocket receive error: {}", e);
                Some(Err(ConnectionError::WebSocket(e.to_string())))
            }
            None => {
                debug!("WebSocket connection closed");
                None
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn sink(&self) -> Arc<dyn ClientSink> {
        self.sink.clone()
    }
}

/// Outbound half of an upgraded WebSocket, shared by the session pumps
pub struct WebSocketSink {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl Debug for WebSocketSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSink").finish_non_exhaustive()
    }
}

impl WebSocketSink {
    async fn send(&self, message: Message) -> ConnectionResult<()> {
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| ConnectionError::WebSocket(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ClientSink for WebSocketSink {
    async fn send_binary(&self, data: Bytes) -> ConnectionResult<()> {
        trace!("Sending binary data to client, size: {}", data.len());
        self.send(Binary(data.to_vec())).await
    }

    async fn send_text(&self, message: String) -> ConnectionResult<()> {
        self.send(Text(message)).await
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.send(Close(None)).await
    }
}
