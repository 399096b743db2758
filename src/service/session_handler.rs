/// Terminal session handler for processing terminal connections
use tracing::{error, info};

use crate::service::{MessageHandler, SessionFactory};
use crate::{app_state::AppState, protocol::TerminalConnection};

/// Serve one client connection until it closes.
///
/// The connection's session is created lazily by the first message that
/// needs it and closed when the loop ends, whatever the reason.
pub async fn handle_terminal_session(mut connection: impl TerminalConnection, state: AppState) {
    let conn_id = connection.id().to_string();
    info!("New terminal connection: {}", conn_id);

    let sink = connection.sink();
    let factory = SessionFactory::new(
        conn_id.clone(),
        state.pty_factory.clone(),
        state.pty_config.clone(),
        state.config.session.clone(),
        state.registry.clone(),
        sink.clone(),
    );
    let handler = MessageHandler::new(conn_id.clone(), sink);

    loop {
        match connection.receive().await {
            Some(Ok(message)) => {
                if handler.handle_message(message, &factory).await {
                    break;
                }
            }
            Some(Err(e)) => {
                error!("Connection error for {}: {}", conn_id, e);
                break;
            }
            None => {
                info!("Connection closed by client: {}", conn_id);
                break;
            }
        }
    }

    factory.teardown().await;
    info!("Terminal connection {} closed", conn_id);
}
