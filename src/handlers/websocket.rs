use axum::{
    extract::State,
    extract::ws::{WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use crate::{app_state::AppState, protocol::WebSocketConnection, service::handle_terminal_session};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = format!("ws-{}", Uuid::new_v4());
    debug!("WebSocket upgraded: {}", connection_id);

    let ws_connection = WebSocketConnection::new(socket, connection_id);
    handle_terminal_session(ws_connection, state).await;
}
