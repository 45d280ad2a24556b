//! Mock Infrastructure for Testing the RPC Monitor
//!
//! ## Components
//!
//! - `RpcMockBuilder`: Wraps mockito to serve canned Ethereum JSON-RPC responses
//! - Test helpers that wire a client, poller and push server against the mock
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{create_poller, RpcMockBuilder};
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_healthy_node(100, 1);
//!
//! let (poller, hub) = create_poller(&mock.url(), PollerConfig::default());
//! ```

pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
