//! Integration tests for full polling cycles against a mocked endpoint.

use crate::mock_infrastructure::{create_poller, RpcMockBuilder, FRAME_TIMEOUT};
use monitor_core::{types::SyncingStatus, PollerConfig, PollerState};
use serde_json::{json, Value};
use std::time::Duration;

fn fast_config(interval_ms: u64) -> PollerConfig {
    PollerConfig { interval: Duration::from_millis(interval_ms), ..Default::default() }
}

/// One cycle against a healthy node fills every metric
#[tokio::test]
async fn test_cycle_against_healthy_node() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_healthy_node(100, 1);
    let (poller, _hub) = create_poller(&mock.url(), PollerConfig::default());

    let snapshot = poller.poll_once().await;

    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.successful_requests, 3);
    assert_eq!(snapshot.failed_requests, 0);
    assert!((snapshot.success_rate - 100.0).abs() < f64::EPSILON);
    assert!(snapshot.error_messages.is_empty());
    assert_eq!(snapshot.last_block_number.as_deref(), Some("0x64"));
    assert_eq!(snapshot.last_chain_id.as_deref(), Some("0x1"));
    assert_eq!(snapshot.syncing_status, Some(SyncingStatus::Flag(false)));
    assert_eq!(snapshot.call_records.len(), 3);
}

/// A failing endpoint produces failed records and one error string per call
#[tokio::test]
async fn test_cycle_against_failing_node() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();
    let (poller, _hub) = create_poller(&mock.url(), PollerConfig::default());

    let snapshot = poller.poll_once().await;

    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.failed_requests, 3);
    assert!(snapshot.success_rate.abs() < f64::EPSILON);
    assert_eq!(snapshot.average_response_time_ms, 0);
    assert!(snapshot.last_block_number.is_none());

    let mut errors = snapshot.error_messages.clone();
    errors.sort();
    assert_eq!(
        errors,
        vec![
            "[eth_blockNumber]: request failed with status code 500",
            "[eth_chainId]: request failed with status code 500",
            "[eth_syncing]: request failed with status code 500",
        ]
    );
}

/// Partial failure is reflected in the rate and the sticky fields that did update
#[tokio::test]
async fn test_partial_failure() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x10)
        .mock_rpc_error("eth_chainId", -32601, "method not found")
        .mock_syncing(json!({
            "startingBlock": "0x0",
            "currentBlock": "0x8",
            "highestBlock": "0x10"
        }));
    let (poller, _hub) = create_poller(&mock.url(), PollerConfig::default());

    let snapshot = poller.poll_once().await;

    assert_eq!(snapshot.successful_requests, 2);
    assert!((snapshot.success_rate - 66.7).abs() < 1e-9);
    assert_eq!(snapshot.error_messages, vec!["[eth_chainId]: method not found".to_string()]);
    assert_eq!(snapshot.last_block_number.as_deref(), Some("0x10"));
    assert!(snapshot.last_chain_id.is_none());
    assert!(snapshot.syncing_status.as_ref().is_some_and(SyncingStatus::is_syncing));
}

/// Subscribers receive one frame per cycle, in cycle order
#[tokio::test]
async fn test_frames_published_in_cycle_order() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_healthy_node(100, 1);
    let (poller, hub) = create_poller(&mock.url(), fast_config(100));
    let mut frames = hub.subscribe();

    poller.start();

    let mut totals = Vec::new();
    for _ in 0..3 {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, frames.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("hub closed");
        let frame: Value = serde_json::from_str(&frame).unwrap();
        totals.push(frame["totalRequests"].as_u64().unwrap());
        assert!(frame["timestamp"].as_u64().unwrap() > 0);
    }
    poller.shutdown().await;

    assert_eq!(totals, vec![3, 6, 9]);
}

/// After shutdown no further cycles run
#[tokio::test]
async fn test_no_cycles_after_shutdown() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_healthy_node(100, 1);
    let (poller, _hub) = create_poller(&mock.url(), fast_config(50));

    poller.start();
    tokio::time::timeout(FRAME_TIMEOUT, async {
        while poller.cycles_completed() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("poller should complete two cycles");

    poller.shutdown().await;
    let cycles = poller.cycles_completed();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(poller.cycles_completed(), cycles);
    assert_eq!(poller.state(), PollerState::Stopped);
    assert!(!poller.is_running());
}

/// The window is bounded by the configured capacity
#[tokio::test]
async fn test_window_capacity_across_cycles() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_healthy_node(100, 1);
    let config = PollerConfig { window_capacity: 5, ..Default::default() };
    let (poller, _hub) = create_poller(&mock.url(), config);

    for _ in 0..4 {
        poller.poll_once().await;
    }

    assert_eq!(poller.store().len(), 5);
    let latest = poller.latest();
    assert_eq!(latest.total_requests, 5);
    let starts: Vec<u64> = latest.call_records.iter().map(|r| r.start_time).collect();
    assert!(starts.windows(2).all(|w| w[0] >= w[1]), "records should be newest first");
}

/// A syncing node with a client-specific progress shape reports syncing
#[tokio::test]
async fn test_non_standard_syncing_progress_is_reported() {
    let progress = json!({"currentBlock": "0x5", "highestBlock": "0xa"});
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x5).mock_chain_id(1).mock_syncing(progress.clone());
    let (poller, _hub) = create_poller(&mock.url(), PollerConfig::default());

    let snapshot = poller.poll_once().await;

    assert_eq!(snapshot.successful_requests, 3);
    assert_eq!(snapshot.syncing_status, Some(SyncingStatus::Other(progress)));
    assert!(snapshot.syncing_status.as_ref().is_some_and(SyncingStatus::is_syncing));
}
