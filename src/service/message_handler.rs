/// Message handler for processing terminal messages
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::protocol::{ClientFrame, ClientSink, ControlMessage, ServerNotice, TerminalMessage};
use crate::pty::WindowSize;
use crate::service::{SessionError, SessionFactory, TerminalSession};

/// Routes inbound frames to the connection's session.
///
/// Text frames are JSON control messages, binary frames are
/// `[cmd][payload]` data frames.
pub struct MessageHandler {
    connection_id: String,
    sink: Arc<dyn ClientSink>,
}

impl MessageHandler {
    /// Create a new message handler
    pub fn new(connection_id: String, sink: Arc<dyn ClientSink>) -> Self {
        Self {
            connection_id,
            sink,
        }
    }

    /// Handle a terminal message.
    /// Returns `true` when the connection should be closed.
    pub async fn handle_message(&self, message: TerminalMessage, factory: &SessionFactory) -> bool {
        match message {
            TerminalMessage::Text(text) => {
                self.handle_control(&text, factory).await;
                false
            }
            TerminalMessage::Binary(frame) => {
                self.handle_binary(frame, factory).await;
                false
            }
            TerminalMessage::Ping(_) => {
                debug!("Received ping from connection {}", self.connection_id);
                false
            }
            TerminalMessage::Pong => {
                debug!("Received pong from connection {}", self.connection_id);
                false
            }
            TerminalMessage::Close => {
                info!("Received close message from connection {}", self.connection_id);
                true
            }
        }
    }

    async fn handle_control(&self, text: &str, factory: &SessionFactory) {
        let control = match serde_json::from_str::<ControlMessage>(text) {
            Ok(control) => control,
            Err(e) => {
                warn!(
                    "Ignoring malformed control message from connection {}: {}",
                    self.connection_id, e
                );
                return;
            }
        };
        debug!("Control message from connection {}: {:?}", self.connection_id, control);

        if let Some(session) = self.session(factory).await {
            self.resize(&session, control.window_size());
        }
    }

    async fn handle_binary(&self, frame: Bytes, factory: &SessionFactory) {
        match ClientFrame::decode(&frame) {
            Some(ClientFrame::Input(data)) if data.is_empty() => {}
            Some(ClientFrame::Input(data)) => {
                if let Some(session) = self.session(factory).await {
                    session.write(data);
                }
            }
            Some(ClientFrame::Resize(size)) => {
                if let Some(session) = self.session(factory).await {
                    self.resize(&session, size);
                }
            }
            None => {
                debug!(
                    "Ignoring binary frame of {} bytes from connection {}",
                    frame.len(),
                    self.connection_id
                );
            }
        }
    }

    fn resize(&self, session: &TerminalSession, size: WindowSize) {
        if let Err(e) = session.resize(size) {
            error!("Failed to resize session {}: {}", session.id(), e);
        }
    }

    /// Get or create the session, replying with an error notice on failure
    async fn session(&self, factory: &SessionFactory) -> Option<Arc<TerminalSession>> {
        match factory.session().await {
            Ok(session) => Some(session),
            Err(e) => {
                self.report(&e).await;
                None
            }
        }
    }

    async fn report(&self, error: &SessionError) {
        let notice = ServerNotice::Error {
            title: "Terminal is unavailable".to_string(),
            message: error.to_string(),
        };
        let payload = match serde_json::to_string(&notice) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize error notice: {}", e);
                return;
            }
        };
        if let Err(e) = self.sink.send_text(payload).await {
            debug!(
                "Could not deliver error notice to connection {}: {}",
                self.connection_id, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::SessionRegistry;
    use crate::config::{SessionConfig, ShellConfig};
    use crate::protocol::CMD_RESIZE;
    use crate::pty::{NativePtyFactory, PtyConfig, PtyError, PtyFactory, SpawnedPty};
    use crate::service::FactoryState;
    use crate::service::test_support::RecordingSink;
    use async_trait::async_trait;

    struct FailingFactory;

    #[async_trait]
    impl PtyFactory for FailingFactory {
        async fn spawn(&self, _config: &PtyConfig) -> Result<SpawnedPty, PtyError> {
            Err(PtyError::Allocation(std::io::Error::other("no ptys left")))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn setup(pty_factory: Arc<dyn PtyFactory>) -> (MessageHandler, SessionFactory, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let factory = SessionFactory::new(
            "conn".to_string(),
            pty_factory,
            Arc::new(PtyConfig::from_shell(&ShellConfig::default())),
            SessionConfig::default(),
            SessionRegistry::new(),
            sink.clone(),
        );
        (MessageHandler::new("conn".to_string(), sink.clone()), factory, sink)
    }

    #[tokio::test]
    async fn ignored_frames_do_not_create_a_session() {
        let (handler, factory, sink) = setup(Arc::new(NativePtyFactory));

        for frame in [
            Bytes::new(),
            Bytes::from_static(&[CMD_RESIZE, 0, 30]),
            Bytes::from_static(&[0x09, 1, 2, 3]),
            Bytes::from_static(&[0x00]),
        ] {
            assert!(!handler.handle_message(TerminalMessage::Binary(frame), &factory).await);
        }
        assert!(
            !handler
                .handle_message(TerminalMessage::Text("not json".to_string()), &factory)
                .await
        );

        assert_eq!(factory.state().await, FactoryState::Absent);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn ready_then_input_reaches_shell() {
        let (handler, factory, sink) = setup(Arc::new(NativePtyFactory));

        handler
            .handle_message(
                TerminalMessage::Text(r#"{"method":"ready","cols":80,"rows":24}"#.to_string()),
                &factory,
            )
            .await;
        assert_eq!(factory.state().await, FactoryState::Ready);

        let input = ClientFrame::Input(Bytes::from_static(b"echo h\"\"i\n")).encode();
        handler
            .handle_message(TerminalMessage::Binary(input), &factory)
            .await;
        sink.wait_for_output("hi").await;

        let resize = ClientFrame::Resize(WindowSize::new(30, 100)).encode();
        handler
            .handle_message(TerminalMessage::Binary(resize), &factory)
            .await;
        let input = ClientFrame::Input(Bytes::from_static(b"stty size\n")).encode();
        handler
            .handle_message(TerminalMessage::Binary(input), &factory)
            .await;
        sink.wait_for_output("30 100").await;

        factory.teardown().await;
    }

    #[tokio::test]
    async fn creation_failure_is_reported_on_control_channel() {
        let (handler, factory, sink) = setup(Arc::new(FailingFactory));

        handler
            .handle_message(
                TerminalMessage::Text(r#"{"method":"resize","rows":30,"cols":100}"#.to_string()),
                &factory,
            )
            .await;

        let texts = sink.texts();
        assert_eq!(texts.len(), 1);
        let notice: ServerNotice = serde_json::from_str(&texts[0]).unwrap();
        let ServerNotice::Error { title, message } = notice;
        assert_eq!(title, "Terminal is unavailable");
        assert!(message.contains("no ptys left"));
        assert_eq!(factory.state().await, FactoryState::Absent);
    }

    #[tokio::test]
    async fn close_message_ends_connection() {
        let (handler, factory, _sink) = setup(Arc::new(NativePtyFactory));
        assert!(handler.handle_message(TerminalMessage::Close, &factory).await);
    }
}
