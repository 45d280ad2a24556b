//! # Monitor Core
//!
//! Core library for the RPC monitor: polls a JSON-RPC endpoint on a fixed
//! interval and turns the outcome of every call into rolling health metrics.
//!
//! - **[`rate_limiter`]**: Sliding-window limiter that every outbound call
//!   waits on.
//!
//! - **[`rpc`]**: Transport abstraction, the reqwest-backed
//!   [`HttpTransport`](rpc::HttpTransport) and the [`RpcClient`](rpc::RpcClient)
//!   that turns each call into a [`CallRecord`](types::CallRecord).
//!
//! - **[`store`]**: Bounded window of recent call records.
//!
//! - **[`metrics`]**: Snapshot type and the pure aggregator.
//!
//! - **[`poller`]**: Timer-driven fan-out/fan-in cycle that ties the above
//!   together and publishes each snapshot to a [`sink`].
//!
//! - **[`config`]**: Layered configuration (defaults, TOML, env).
//!
//! ## Cycle Flow
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//! ┌─────────────────┐  spawn per call  ┌─────────────┐   ┌───────────┐
//! │     Poller      │ ───────────────► │  RpcClient  │──►│ Transport │
//! └────────┬────────┘                  │  (limiter)  │   └───────────┘
//!          │ join all                  └─────────────┘
//!          ▼
//! ┌─────────────────┐   ┌────────────┐   ┌─────────────┐
//! │ CallRecordStore │──►│ aggregator │──►│ latest slot │
//! └─────────────────┘   └────────────┘   └──────┬──────┘
//!                                               │ publish
//!                                               ▼
//!                                        ┌─────────────┐
//!                                        │ MetricsSink │
//!                                        └─────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod metrics;
pub mod poller;
pub mod rate_limiter;
pub mod rpc;
pub mod sink;
pub mod store;
pub mod types;

pub use metrics::RpcMetrics;
pub use poller::{Poller, PollerConfig, PollerState, RpcCall};
pub use rate_limiter::{RateLimitError, RateLimiter, RateLimiterConfig};
pub use sink::{BroadcastHub, MetricsSink};
pub use store::CallRecordStore;
