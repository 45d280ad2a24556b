use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, warn};

use super::{Transport, TransportError, TransportResponse};
use crate::{
    clock::MonotonicClock,
    rate_limiter::RateLimiter,
    types::{
        CallError, CallRecord, JsonRpcRequest, PendingCall, ETH_BLOCK_NUMBER, ETH_CHAIN_ID,
        ETH_SYNCING,
    },
};

/// Endpoint polled when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://eth1.lava.build";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Returns the next JSON-RPC request id.
///
/// Ids are shared by every client in the process and never reused.
#[must_use]
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Configuration for [`RpcClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClientConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Per-call timeout handed to the transport
    pub timeout: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), timeout: Duration::from_secs(10) }
    }
}

/// Issues rate-limited JSON-RPC calls and records their outcome.
///
/// [`call`](Self::call) never fails: rate limit timeouts, transport failures
/// and protocol errors all come back as a failed [`CallRecord`].
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    config: RpcClientConfig,
    clock: MonotonicClock,
}

/// Outcome of decoding a response body.
enum Envelope {
    Success(Value),
    Failure(CallError),
    Malformed,
}

impl RpcClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<RateLimiter>,
        config: RpcClientConfig,
    ) -> Self {
        Self { transport, rate_limiter, config, clock: MonotonicClock::new() }
    }

    /// Replaces the clock used to timestamp records.
    #[must_use]
    pub fn with_clock(mut self, clock: MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Calls `method` and returns the settled record.
    pub async fn call(&self, method: &str, params: Value) -> CallRecord {
        let requested_at = self.clock.now_ms();
        if let Err(e) = self.rate_limiter.acquire().await {
            warn!(method, error = %e, "rpc call dropped by rate limiter");
            return PendingCall::start(method, requested_at).fail(
                CallError::rate_limited(&e),
                None,
                self.clock.now_ms(),
            );
        }

        let request = JsonRpcRequest::new(method, params, next_request_id());
        let pending = PendingCall::start(method, self.clock.now_ms());

        let outcome =
            self.transport.send(&self.config.endpoint, &request, self.config.timeout).await;
        let end_time = self.clock.now_ms();

        let record = match outcome {
            Ok(response) => Self::settle_response(pending, &response, end_time),
            Err(error) => Self::settle_failure(pending, &error, end_time),
        };

        debug!(
            method,
            id = request.id,
            success = record.is_success,
            status = ?record.status_code,
            duration_ms = record.duration_ms(),
            "rpc call settled"
        );
        if let Some(error) = &record.error {
            debug!(method, kind = error.kind.as_str(), error = %error.message, "rpc call failed");
        }
        record
    }

    /// `eth_blockNumber`
    pub async fn block_number(&self) -> CallRecord {
        self.call(ETH_BLOCK_NUMBER, json!([])).await
    }

    /// `eth_chainId`
    pub async fn chain_id(&self) -> CallRecord {
        self.call(ETH_CHAIN_ID, json!([])).await
    }

    /// `eth_syncing`
    pub async fn syncing(&self) -> CallRecord {
        self.call(ETH_SYNCING, json!([])).await
    }

    fn settle_response(
        pending: PendingCall,
        response: &TransportResponse,
        end_time: u64,
    ) -> CallRecord {
        let status = Some(response.status);
        match Self::decode_envelope(&response.body) {
            Envelope::Success(result) => pending.succeed(result, status, end_time),
            Envelope::Failure(error) => pending.fail(error, status, end_time),
            Envelope::Malformed => pending.fail(CallError::invalid_response(), status, end_time),
        }
    }

    /// Non-2xx bodies that carry a JSON-RPC error keep that error; everything
    /// else is described by the transport failure itself.
    fn settle_failure(pending: PendingCall, error: &TransportError, end_time: u64) -> CallRecord {
        let call_error = error
            .body()
            .and_then(|body| match Self::decode_envelope(body) {
                Envelope::Failure(rpc_error) => Some(rpc_error),
                Envelope::Success(_) | Envelope::Malformed => None,
            })
            .unwrap_or_else(|| CallError::transport(error));
        pending.fail(call_error, error.status(), end_time)
    }

    /// A present `result` key wins, even when its value is `null`.
    fn decode_envelope(body: &[u8]) -> Envelope {
        let Ok(Value::Object(mut envelope)) = serde_json::from_slice::<Value>(body) else {
            return Envelope::Malformed;
        };

        if let Some(result) = envelope.remove("result") {
            return Envelope::Success(result);
        }

        envelope
            .remove("error")
            .and_then(Self::decode_error)
            .map_or(Envelope::Malformed, Envelope::Failure)
    }

    fn decode_error(error: Value) -> Option<CallError> {
        match error {
            Value::Object(mut fields) => {
                let code = fields.get("code").and_then(Value::as_i64);
                let message = fields.get("message").and_then(Value::as_str).map(str::to_owned);
                if code.is_none() && message.is_none() {
                    return None;
                }
                let data = fields.remove("data");
                let message = message.unwrap_or_else(|| Value::Object(fields).to_string());
                Some(CallError::protocol(code, message, data))
            }
            Value::String(message) => Some(CallError::protocol(None, message, None)),
            _ => None,
        }
    }
}
