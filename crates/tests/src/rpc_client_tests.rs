//! Integration tests for `RpcClient` over the HTTP transport.
//!
//! Each test runs against its own mockito server so every outcome class
//! (success, RPC error, non-2xx, malformed body, unreachable endpoint) goes
//! through real HTTP.

use crate::mock_infrastructure::{create_client, RpcMockBuilder};
use monitor_core::{
    types::{CallErrorKind, INVALID_RESPONSE_MESSAGE},
    RateLimiterConfig,
};
use serde_json::json;
use std::time::Duration;

/// Successful `eth_blockNumber` populates the result and status
#[tokio::test]
async fn test_block_number_success() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x64);
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.block_number().await;

    assert!(record.is_success, "record should succeed: {record:?}");
    assert_eq!(record.method, "eth_blockNumber");
    assert_eq!(record.result_str(), Some("0x64"));
    assert_eq!(record.status_code, Some(200));
    assert!(record.error.is_none());
    assert!(record.end_time >= record.start_time);
}

/// `eth_syncing` returning `false` is a successful boolean result
#[tokio::test]
async fn test_syncing_false_is_success() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_syncing(json!(false));
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.syncing().await;

    assert!(record.is_success);
    assert_eq!(record.result, Some(json!(false)));
}

/// The request envelope carries version, method, array params and an integer id
#[tokio::test]
async fn test_request_envelope_shape() {
    let mut mock = RpcMockBuilder::new().await;
    let envelope = mock
        .server()
        .mock("POST", "/")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "method": "eth_chainId",
                "params": []
            })),
            mockito::Matcher::Regex(r#""id"\s*:\s*\d+"#.to_string()),
        ]))
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"}).to_string())
        .expect(1)
        .create();
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.chain_id().await;

    assert!(record.is_success);
    envelope.assert_async().await;
}

/// A JSON-RPC error payload is a protocol failure with the endpoint's code
#[tokio::test]
async fn test_rpc_error_payload() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("eth_chainId", -32000, "Test RPC error");
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.chain_id().await;

    assert!(!record.is_success);
    assert!(record.result.is_none());
    assert_eq!(record.status_code, Some(200));
    let error = record.error.expect("error should be recorded");
    assert_eq!(error.kind, CallErrorKind::Protocol);
    assert_eq!(error.code, Some(-32000));
    assert_eq!(error.message, "Test RPC error");
}

/// A plain 500 is a transport failure carrying the status code
#[tokio::test]
async fn test_server_error_without_rpc_body() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.block_number().await;

    assert!(!record.is_success);
    assert_eq!(record.status_code, Some(500));
    let error = record.error.expect("error should be recorded");
    assert_eq!(error.kind, CallErrorKind::Transport);
    assert_eq!(error.message, "request failed with status code 500");
}

/// A non-2xx response whose body holds a JSON-RPC error keeps that error
#[tokio::test]
async fn test_http_error_with_rpc_body() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_http_error(
        "eth_blockNumber",
        429,
        &json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32005, "message": "rate limited"}})
            .to_string(),
    );
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.block_number().await;

    assert_eq!(record.status_code, Some(429));
    let error = record.error.expect("error should be recorded");
    assert_eq!(error.kind, CallErrorKind::Protocol);
    assert_eq!(error.code, Some(-32005));
    assert_eq!(error.message, "rate limited");
}

/// A 200 body that is not an envelope is reported as an invalid structure
#[tokio::test]
async fn test_malformed_body() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_malformed("eth_syncing", r#"{"jsonrpc":"2.0","id":1}"#);
    let client = create_client(&mock.url(), RateLimiterConfig::default());

    let record = client.syncing().await;

    assert!(!record.is_success);
    assert_eq!(record.status_code, Some(200));
    assert_eq!(record.error.expect("error should be recorded").message, INVALID_RESPONSE_MESSAGE);
}

/// An unreachable endpoint yields a failed record with no status code
#[tokio::test]
async fn test_unreachable_endpoint() {
    let client = create_client("http://127.0.0.1:1", RateLimiterConfig::default());

    let record = client.block_number().await;

    assert!(!record.is_success);
    assert!(record.status_code.is_none());
    let error = record.error.expect("error should be recorded");
    assert_eq!(error.kind, CallErrorKind::Transport);
    assert!(!error.message.is_empty());
}

/// Calls beyond the limit fail fast as rate limit errors without reaching the endpoint
#[tokio::test]
async fn test_rate_limited_calls_never_reach_endpoint() {
    let mut mock = RpcMockBuilder::new().await;
    let endpoint = mock
        .server()
        .mock("POST", "/")
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"}).to_string())
        .expect(2)
        .create();
    let limiter = RateLimiterConfig::new(2, Duration::from_secs(60))
        .with_max_wait(Duration::from_millis(100));
    let client = create_client(&mock.url(), limiter);

    assert!(client.block_number().await.is_success);
    assert!(client.block_number().await.is_success);
    let throttled = client.block_number().await;

    assert!(!throttled.is_success);
    assert_eq!(throttled.error.expect("error should be recorded").kind, CallErrorKind::RateLimit);
    endpoint.assert_async().await;
}
