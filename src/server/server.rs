/// Server implementation for rs_tty
use std::future::Future;

use axum::{Router, http::Method, routing::get};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{app_state::AppState, handlers};

/// Build the application router with routes
pub fn build_router(state: AppState) -> Router {
    // Create CORS layer to allow cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "rs_tty" }))
        .route("/health", get(handlers::rest::health_check))
        .route("/api/v1/ping", get(handlers::rest::ping))
        // Terminal WebSocket, with and without the trailing slash browsers use
        .route("/ws", get(handlers::websocket::websocket_handler))
        .route("/ws/", get(handlers::websocket::websocket_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM
pub async fn run_server(router: Router, state: &AppState) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", state.config.server.address, state.config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", listener.local_addr()?);
    info!("WebSocket server available at ws://{}/ws", addr);

    serve(listener, router, state.clone(), shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Upgraded WebSocket connections are not tracked by the HTTP server, so every
/// live terminal session is closed through the registry once the signal fires.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    state: AppState,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = state.registry.clone();
    let graceful_shutdown = async move {
        shutdown.await;
        info!("Initiating graceful shutdown...");
        let closed = registry.close_all().await;
        info!("Closed {} terminal session(s)", closed);
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    // Sessions created while the listener was draining
    state.registry.close_all().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
