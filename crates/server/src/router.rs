use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use monitor_core::{BroadcastHub, Poller};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::subscribers;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<Poller>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    #[must_use]
    pub fn new(poller: Arc<Poller>, hub: Arc<BroadcastHub>) -> Self {
        Self { poller, hub }
    }
}

/// Builds the push server routes.
///
/// `/` and `/ws` both upgrade to the metrics feed so plain `ws://host:port`
/// clients work.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_ws))
        .route("/ws", get(handle_ws))
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the push server on `listener` until `shutdown` resolves.
///
/// Shutdown stops the poller before connections drain. Once the server has
/// returned, for any reason, the poller's timer task is awaited.
///
/// # Errors
///
/// Returns the I/O error that ended the server.
pub async fn serve_until<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let poller = state.poller.clone();
    let shutdown_poller = poller.clone();

    let result = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            shutdown_poller.stop();
        })
        .await;

    if let Err(e) = &result {
        error!(error = %e, "Server error occurred");
    }
    poller.shutdown().await;
    result
}

pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| subscribers::serve(socket, state.hub, state.poller))
}

/// Returns the latest snapshot.
pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    let snapshot = state.poller.latest();
    (StatusCode::OK, Json(snapshot.as_ref())).into_response()
}

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let health_status = serde_json::json!({
        "status": "ok",
        "running": state.poller.is_running(),
        "cycles": state.poller.cycles_completed(),
    });

    (StatusCode::OK, Json(health_status))
}
