//! JSON-RPC client stack: transport, error types and the recording client.

pub mod client;
pub mod errors;
pub mod transport;

pub use client::{next_request_id, RpcClient, RpcClientConfig, DEFAULT_ENDPOINT};
pub use errors::TransportError;
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportResponse};
