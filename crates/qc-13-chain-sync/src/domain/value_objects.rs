//! # Value Objects
//!
//! Checkpoint ranges, header requests and progress reports.

use crate::domain::{SyncError, SyncMode};
use serde::{Deserialize, Serialize};
use shared_types::{BlockHeader, PeerId};

/// A segment of the target's chain bounded by headers it served us.
///
/// `start` is already known locally (or is the previous range's end). An
/// absent `end` marks the open-ended final segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointRange {
    sync_target: PeerId,
    start: BlockHeader,
    end: Option<BlockHeader>,
}

impl CheckpointRange {
    /// Closed range. `end` must lie above `start`.
    pub fn new(
        sync_target: PeerId,
        start: BlockHeader,
        end: BlockHeader,
    ) -> Result<Self, SyncError> {
        if end.number <= start.number {
            return Err(SyncError::InvalidRange {
                start: start.number,
                end: end.number,
            });
        }
        Ok(Self {
            sync_target,
            start,
            end: Some(end),
        })
    }

    /// Open-ended range from `start` to wherever the peer's chain ends.
    pub fn open(sync_target: PeerId, start: BlockHeader) -> Self {
        Self {
            sync_target,
            start,
            end: None,
        }
    }

    pub fn sync_target(&self) -> PeerId {
        self.sync_target
    }

    pub fn start(&self) -> &BlockHeader {
        &self.start
    }

    pub fn end(&self) -> Option<&BlockHeader> {
        self.end.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Blocks strictly between the two boundaries.
    ///
    /// `None` for an open-ended range.
    pub fn segment_length_exclusive(&self) -> Option<u64> {
        self.end
            .as_ref()
            .map(|end| end.number - self.start.number - 1)
    }
}

impl std::fmt::Display for CheckpointRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.end {
            Some(end) => write!(f, "{}..={}", self.start.number, end.number),
            None => write!(f, "{}..", self.start.number),
        }
    }
}

/// Header request: `count` headers from `start`, `skip` blocks apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderRequest {
    pub start: u64,
    pub count: u64,
    pub skip: u64,
}

impl HeaderRequest {
    /// Consecutive headers.
    pub fn contiguous(start: u64, count: u64) -> Self {
        Self {
            start,
            count,
            skip: 0,
        }
    }

    pub fn single(number: u64) -> Self {
        Self::contiguous(number, 1)
    }

    /// Block numbers the request covers, in order.
    pub fn numbers(&self) -> impl Iterator<Item = u64> {
        let step = self.skip + 1;
        let start = self.start;
        (0..self.count).map(move |i| start + i * step)
    }
}

/// Result of running the pipeline over one batch of ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub ranges_imported: usize,
    pub blocks_imported: u64,
    /// Header of the last block imported.
    pub last_imported: Option<BlockHeader>,
}

impl PipelineReport {
    /// Fold a later report into this one.
    pub fn merge(&mut self, later: PipelineReport) {
        self.ranges_imported += later.ranges_imported;
        self.blocks_imported += later.blocks_imported;
        if later.last_imported.is_some() {
            self.last_imported = later.last_imported;
        }
    }
}

/// What one round of the sync loop achieved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No peer has anything we need.
    NoTarget,
    /// Synced the target to completion.
    Completed(PipelineReport),
    /// Target dropped before completion (better peer, disconnect).
    Retargeted(PipelineReport),
}

/// Snapshot of sync progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub mode: SyncMode,
    pub local_height: u64,
    pub target_peer: Option<PeerId>,
    pub target_height: Option<u64>,
    pub blocks_imported: u64,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        self.target_peer.is_some()
    }
}
