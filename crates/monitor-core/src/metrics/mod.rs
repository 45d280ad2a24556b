//! Aggregated metrics snapshots and the frame format pushed to subscribers.

pub mod aggregator;

pub use aggregator::compute;

use serde::{Deserialize, Serialize};

use crate::types::{CallRecord, SyncingStatus};

/// Maximum number of error strings carried by a snapshot.
pub const MAX_ERROR_MESSAGES: usize = 10;

/// Metrics derived from one window of call records.
///
/// A snapshot is rebuilt from scratch every cycle and never patched in place.
/// `last_block_number`, `last_chain_id` and `syncing_status` are sticky: they
/// keep the previous snapshot's value until a newer successful record
/// replaces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMetrics {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Percentage of successful calls, rounded to one decimal.
    pub success_rate: f64,
    /// Mean duration of successful calls, in milliseconds.
    pub average_response_time_ms: u64,
    /// `[method]: message` strings, newest first.
    pub error_messages: Vec<String>,
    pub last_block_number: Option<String>,
    pub last_chain_id: Option<String>,
    pub syncing_status: Option<SyncingStatus>,
    /// The window, newest first.
    pub call_records: Vec<CallRecord>,
}

/// A snapshot as sent over the wire, stamped with its publication time.
#[derive(Debug, Serialize)]
pub struct MetricsFrame<'a> {
    /// Unix milliseconds at publication
    pub timestamp: u64,
    #[serde(flatten)]
    pub metrics: &'a RpcMetrics,
}

impl<'a> MetricsFrame<'a> {
    #[must_use]
    pub fn new(metrics: &'a RpcMetrics, timestamp: u64) -> Self {
        Self { timestamp, metrics }
    }

    /// Serializes the frame as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if a record payload cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
