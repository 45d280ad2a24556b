//! Test Helper Functions and Utilities
//!
//! Wiring shortcuts for building the monitor stack against a mock endpoint and
//! for talking to a live push server.

use futures_util::StreamExt;
use monitor_core::{
    rpc::{HttpTransport, RpcClient, RpcClientConfig},
    BroadcastHub, Poller, PollerConfig, RateLimiter, RateLimiterConfig,
};
use serde_json::Value;
use server::router::{create_router, AppState};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// WebSocket client stream as returned by `connect_async`.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for a frame before failing.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates an RPC client over the real HTTP transport.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn create_client(endpoint: &str, limiter: RateLimiterConfig) -> Arc<RpcClient> {
    let transport = Arc::new(HttpTransport::new().expect("http transport should build"));
    let config =
        RpcClientConfig { endpoint: endpoint.to_string(), timeout: Duration::from_secs(2) };
    Arc::new(RpcClient::new(transport, Arc::new(RateLimiter::new(limiter)), config))
}

/// Creates a poller publishing into a fresh hub.
#[must_use]
pub fn create_poller(endpoint: &str, config: PollerConfig) -> (Arc<Poller>, Arc<BroadcastHub>) {
    let client = create_client(endpoint, RateLimiterConfig::default());
    let hub = Arc::new(BroadcastHub::default());
    let poller = Arc::new(Poller::new(client, hub.clone(), config));
    (poller, hub)
}

/// Serves the push server routes on an ephemeral local port.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn spawn_push_server(state: AppState) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind local port");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(state)).await;
    });

    (addr, handle)
}

/// Connects a WebSocket subscriber to `path` on the push server.
///
/// # Panics
///
/// Panics if the handshake fails.
pub async fn connect_subscriber(addr: SocketAddr, path: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket handshake should succeed");
    ws
}

/// Waits for the next text frame and parses it as JSON.
///
/// # Panics
///
/// Panics on timeout, on a closed stream or if the frame is not JSON text.
pub async fn next_json_frame(ws: &mut WsClient) -> Value {
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");

        match message {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("frame should be JSON")
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
