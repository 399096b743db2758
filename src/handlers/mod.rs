/// HTTP and WebSocket handlers
pub mod rest;
pub mod websocket;
