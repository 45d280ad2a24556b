//! Fan-out of metrics snapshots to live subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::{
    clock::unix_now_ms,
    metrics::{MetricsFrame, RpcMetrics},
};

/// Frames buffered per subscriber before it starts lagging.
pub const DEFAULT_HUB_CAPACITY: usize = 16;

/// Receives every snapshot produced by the poller.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, snapshot: Arc<RpcMetrics>);
}

/// [`MetricsSink`] that serializes each snapshot once and broadcasts the JSON
/// frame to every subscriber.
///
/// Publishing without subscribers is a silent no-op. A subscriber that falls
/// more than `capacity` frames behind observes
/// [`broadcast::error::RecvError::Lagged`] and resumes from the newest frame.
#[derive(Debug)]
pub struct BroadcastHub {
    sender: broadcast::Sender<Arc<str>>,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Encodes `snapshot` as a frame stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn encode(snapshot: &RpcMetrics) -> Result<Arc<str>, serde_json::Error> {
        MetricsFrame::new(snapshot, unix_now_ms()).to_json().map(Arc::from)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

impl MetricsSink for BroadcastHub {
    fn publish(&self, snapshot: Arc<RpcMetrics>) {
        if self.sender.receiver_count() == 0 {
            trace!("no subscribers, dropping snapshot");
            return;
        }

        let frame = match Self::encode(&snapshot) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "failed to encode metrics frame");
                return;
            }
        };

        // A send error only means every receiver went away since the check.
        if let Ok(delivered) = self.sender.send(frame) {
            trace!(subscribers = delivered, "metrics frame published");
        }
    }
}
