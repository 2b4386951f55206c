//! # Chain Sync Configuration

use crate::domain::SyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chain sync configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Blocks between consecutive checkpoint headers.
    pub checkpoint_span: u64,

    /// Checkpoint headers asked for in one skeleton request.
    pub max_checkpoints_per_request: usize,

    /// Ranges downloading ahead of the importer.
    pub max_inflight_ranges: usize,

    /// Bodies (and receipts) per request.
    pub body_batch_size: usize,

    /// Deadline for every request sent to a peer.
    pub request_timeout_ms: u64,

    /// Wait before retrying when there is no usable target.
    pub retarget_poll_interval_ms: u64,

    /// How often a running sync checks for a better target.
    pub target_check_interval_ms: u64,

    /// Extra total difficulty a peer needs to replace the current target.
    pub min_td_switch_differential: u64,

    /// Extra height a peer needs to replace the current target when the
    /// total difficulties are equal.
    pub min_height_switch_differential: u64,

    /// Fast sync pivot offset below the target's advertised height.
    pub fast_sync_pivot_distance: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            checkpoint_span: 200,
            max_checkpoints_per_request: 10,
            max_inflight_ranges: 4,
            body_batch_size: 64,
            request_timeout_ms: 10_000,
            retarget_poll_interval_ms: 5_000,
            target_check_interval_ms: 2_000,
            min_td_switch_differential: 1_000_000_000,
            min_height_switch_differential: 200,
            fast_sync_pivot_distance: 50,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (small spans, short timers).
    pub fn for_testing() -> Self {
        Self {
            checkpoint_span: 10,
            max_checkpoints_per_request: 5,
            max_inflight_ranges: 2,
            body_batch_size: 4,
            request_timeout_ms: 1_000,
            retarget_poll_interval_ms: 20,
            target_check_interval_ms: 20,
            min_td_switch_differential: 10,
            min_height_switch_differential: 10,
            fast_sync_pivot_distance: 5,
        }
    }

    /// Reject values the sync loop cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        let invalid = |field: &str| Err(SyncError::InvalidConfig(format!("{field} must be > 0")));

        if self.checkpoint_span == 0 {
            return invalid("checkpoint_span");
        }
        if self.max_checkpoints_per_request == 0 {
            return invalid("max_checkpoints_per_request");
        }
        if self.max_inflight_ranges == 0 {
            return invalid("max_inflight_ranges");
        }
        if self.body_batch_size == 0 {
            return invalid("body_batch_size");
        }
        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retarget_poll_interval(&self) -> Duration {
        Duration::from_millis(self.retarget_poll_interval_ms)
    }

    pub fn target_check_interval(&self) -> Duration {
        Duration::from_millis(self.target_check_interval_ms)
    }
}
