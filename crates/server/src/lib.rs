//! Push server for the RPC monitor.
//!
//! - **[`router`]**: axum routes for the WebSocket feed, the latest snapshot and
//!   liveness.
//! - **[`subscribers`]**: per-connection WebSocket sessions fed from the
//!   [`BroadcastHub`](monitor_core::BroadcastHub).

pub mod router;
pub mod subscribers;
