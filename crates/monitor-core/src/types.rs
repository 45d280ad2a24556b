//! Core type definitions for JSON-RPC envelopes and call records.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`]: the outbound request envelope
//!
//! ## Call Records
//! - [`PendingCall`]: a call that has started but not settled
//! - [`CallRecord`]: the immutable, finalized outcome of one call
//! - [`CallError`] / [`CallErrorKind`]: failure data captured inside a record
//!
//! ## Chain State
//! - [`SyncingStatus`]: the decoded `eth_syncing` result

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

use crate::{rate_limiter::RateLimitError, rpc::TransportError};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Method reporting the latest block number of the endpoint.
pub const ETH_BLOCK_NUMBER: &str = "eth_blockNumber";

/// Method reporting the chain id served by the endpoint.
pub const ETH_CHAIN_ID: &str = "eth_chainId";

/// Method reporting whether the endpoint is still syncing.
pub const ETH_SYNCING: &str = "eth_syncing";

/// Methods polled on every cycle when no explicit set is configured.
pub const DEFAULT_POLLED_METHODS: &[&str] = &[ETH_BLOCK_NUMBER, ETH_CHAIN_ID, ETH_SYNCING];

/// Message recorded when a response carries neither `result` nor `error`.
pub const INVALID_RESPONSE_MESSAGE: &str = "invalid response structure";

/// JSON-RPC 2.0 request envelope.
///
/// `params` is always an array; `id` is an integer taken from the process-wide
/// request counter in [`crate::rpc::next_request_id`].
///
/// # Example
///
/// ```
/// use monitor_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_blockNumber", json!([]), 7);
/// let encoded = serde_json::to_value(&request).unwrap();
///
/// assert_eq!(
///     encoded,
///     json!({"jsonrpc": "2.0", "method": "eth_blockNumber", "params": [], "id": 7})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    /// Creates a request envelope. Non-array params are wrapped into a
    /// single-element array; `null` becomes an empty array.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        let params = match params {
            Value::Array(_) => params,
            Value::Null => Value::Array(Vec::new()),
            other => Value::Array(vec![other]),
        };
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id }
    }
}

/// Which layer a call failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    /// No rate limiter permission could be obtained within the wait budget.
    RateLimit,
    /// The request never produced a usable response (network, timeout, non-2xx).
    Transport,
    /// A response arrived but was malformed or carried a JSON-RPC error.
    Protocol,
}

impl CallErrorKind {
    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
        }
    }
}

/// Failure data captured inside a [`CallRecord`].
///
/// Endpoint errors keep their numeric `code`; transport and rate limit
/// failures are message-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallError {
    pub kind: CallErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CallError {
    #[must_use]
    pub fn rate_limited(error: &RateLimitError) -> Self {
        Self { kind: CallErrorKind::RateLimit, code: None, message: error.to_string(), data: None }
    }

    #[must_use]
    pub fn transport(error: &TransportError) -> Self {
        Self { kind: CallErrorKind::Transport, code: None, message: error.to_string(), data: None }
    }

    #[must_use]
    pub fn protocol(code: Option<i64>, message: impl Into<String>, data: Option<Value>) -> Self {
        Self { kind: CallErrorKind::Protocol, code, message: message.into(), data }
    }

    /// The error recorded for a response with neither `result` nor `error`.
    #[must_use]
    pub fn invalid_response() -> Self {
        Self::protocol(None, INVALID_RESPONSE_MESSAGE, None)
    }
}

/// A call that has started but not yet settled.
///
/// Only the method and start time are known. Settling consumes the pending
/// call and yields the immutable [`CallRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    method: String,
    start_time: u64,
}

impl PendingCall {
    #[must_use]
    pub fn start(method: impl Into<String>, start_time: u64) -> Self {
        Self { method: method.into(), start_time }
    }

    /// Settles the call with a success payload.
    #[must_use]
    pub fn succeed(self, result: Value, status_code: Option<u16>, end_time: u64) -> CallRecord {
        CallRecord {
            end_time: end_time.max(self.start_time),
            method: self.method,
            start_time: self.start_time,
            is_success: true,
            status_code,
            result: Some(result),
            error: None,
        }
    }

    /// Settles the call with a failure.
    #[must_use]
    pub fn fail(self, error: CallError, status_code: Option<u16>, end_time: u64) -> CallRecord {
        CallRecord {
            end_time: end_time.max(self.start_time),
            method: self.method,
            start_time: self.start_time,
            is_success: false,
            status_code,
            result: None,
            error: Some(error),
        }
    }
}

/// One settled RPC attempt.
///
/// Exactly one of `result` / `error` is present, matching `is_success`, and
/// `end_time >= start_time`. Records are built through [`PendingCall`], which
/// upholds both.
///
/// Times are milliseconds on a monotonic clock anchored to wall-clock time
/// when the issuing client was created (see [`crate::clock::MonotonicClock`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub method: String,
    pub start_time: u64,
    pub end_time: u64,
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl CallRecord {
    /// Wall time spent between start and settlement.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// The success payload as a string, when it is one.
    #[must_use]
    pub fn result_str(&self) -> Option<&str> {
        self.result.as_ref().and_then(Value::as_str)
    }
}

/// Progress reported by a syncing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub starting_block: String,
    pub current_block: String,
    pub highest_block: String,
}

/// Decoded `eth_syncing` result.
///
/// Nodes answer `false` when fully synced and a progress object otherwise.
/// Clients disagree on the progress fields, so any shape that is neither a
/// flag nor the standard progress object is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncingStatus {
    Flag(bool),
    Progress(SyncProgress),
    Other(Value),
}

impl SyncingStatus {
    /// Decodes an `eth_syncing` result. Never fails: unknown shapes land in
    /// [`SyncingStatus::Other`].
    #[must_use]
    pub fn from_result(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_else(|_| Self::Other(value.clone()))
    }

    /// `null` counts as not syncing; any other non-standard payload means the
    /// node reported progress.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Progress(_) => true,
            Self::Other(value) => !value.is_null(),
        }
    }
}
