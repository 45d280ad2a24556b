//! WebSocket subscriber sessions.
//!
//! Each session subscribes to the hub before encoding the greeting, so no
//! frame published in between is lost. Frames are forwarded verbatim; a
//! session that falls behind skips to the newest frame instead of closing.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use monitor_core::{BroadcastHub, Poller};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Runs one subscriber session until the client goes away.
pub async fn serve(socket: WebSocket, hub: Arc<BroadcastHub>, poller: Arc<Poller>) {
    let mut frames = hub.subscribe();
    info!(subscribers = hub.subscriber_count(), "subscriber connected");

    let (mut sender, mut receiver) = socket.split();

    match BroadcastHub::encode(&poller.latest()) {
        Ok(greeting) => {
            if let Err(e) = sender.send(Message::Text(greeting.to_string().into())).await {
                debug!(error = %e, "failed to send initial snapshot");
                return;
            }
        }
        Err(e) => error!(error = %e, "failed to encode initial snapshot"),
    }

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if let Err(e) = sender.send(Message::Text(frame.to_string().into())).await {
                        debug!(error = %e, "subscriber send failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagging, skipping to newest frame");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    debug!(message = %text.as_str(), "ignoring inbound subscriber message");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "subscriber receive failed");
                    break;
                }
            },
        }
    }

    drop(frames);
    info!(subscribers = hub.subscriber_count(), "subscriber disconnected");
}
