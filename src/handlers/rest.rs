/// REST handlers for liveness probes
use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::dto::{PingResponse, SuccessResponse},
    app_state::AppState,
};

pub const VERSION_HEADER: &str = "x-version";

/// Ping endpoint, answers with the server version in a header
pub async fn ping() -> impl IntoResponse {
    debug!("Ping");
    (
        StatusCode::OK,
        [(
            HeaderName::from_static(VERSION_HEADER),
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        )],
        Json(PingResponse { status: true }),
    )
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: format!(
                "Health check passed, {} active session(s)",
                state.session_count()
            ),
        }),
    )
}
