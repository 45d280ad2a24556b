//! Pure reduction from a window of call records to an [`RpcMetrics`] snapshot.

use std::collections::VecDeque;

use super::{RpcMetrics, MAX_ERROR_MESSAGES};
use crate::types::{CallRecord, SyncingStatus, ETH_BLOCK_NUMBER, ETH_CHAIN_ID, ETH_SYNCING};

/// Builds a snapshot from `records` (insertion order).
///
/// Sticky fields start from `previous` and are overwritten by every successful
/// record of the matching method, so the last such record in the window wins.
#[must_use]
pub fn compute(records: &[CallRecord], previous: &RpcMetrics) -> RpcMetrics {
    let mut successful = 0usize;
    let mut total_response_ms = 0u64;
    let mut errors: VecDeque<String> = VecDeque::with_capacity(MAX_ERROR_MESSAGES + 1);

    let mut last_block_number = previous.last_block_number.clone();
    let mut last_chain_id = previous.last_chain_id.clone();
    let mut syncing_status = previous.syncing_status.clone();

    for record in records {
        if record.is_success {
            successful += 1;
            total_response_ms = total_response_ms.saturating_add(record.duration_ms());

            match record.method.as_str() {
                ETH_BLOCK_NUMBER => {
                    if let Some(block) = record.result_str() {
                        last_block_number = Some(block.to_owned());
                    }
                }
                ETH_CHAIN_ID => {
                    if let Some(chain) = record.result_str() {
                        last_chain_id = Some(chain.to_owned());
                    }
                }
                ETH_SYNCING => {
                    if let Some(result) = &record.result {
                        syncing_status = Some(SyncingStatus::from_result(result));
                    }
                }
                _ => {}
            }
        } else if let Some(error) = &record.error {
            if errors.len() == MAX_ERROR_MESSAGES {
                errors.pop_front();
            }
            errors.push_back(format!("[{}]: {}", record.method, error.message));
        }
    }

    let total = records.len();

    RpcMetrics {
        total_requests: total,
        successful_requests: successful,
        failed_requests: total - successful,
        success_rate: success_rate(successful, total),
        average_response_time_ms: average_ms(total_response_ms, successful),
        error_messages: errors.into_iter().rev().collect(),
        last_block_number,
        last_chain_id,
        syncing_status,
        call_records: records.iter().rev().cloned().collect(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = successful as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn average_ms(total_ms: u64, successful: usize) -> u64 {
    if successful == 0 {
        return 0;
    }
    (total_ms as f64 / successful as f64).round() as u64
}
