//! # Checkpoint Partitioning
//!
//! Splits `(from, to]` into spans bounded by checkpoint headers.

use crate::domain::{CheckpointRange, SyncError};
use shared_types::{BlockHeader, PeerId};

/// Checkpoint numbers above `from`: every `span` blocks, with the last one
/// clipped to `to`. At most `max` entries.
///
/// Empty when `from >= to`.
pub fn checkpoint_numbers(from: u64, to: u64, span: u64, max: usize) -> Vec<u64> {
    let span = span.max(1);
    let mut numbers = Vec::new();
    let mut next = from;
    while next < to && numbers.len() < max {
        next = next.saturating_add(span).min(to);
        numbers.push(next);
    }
    numbers
}

/// Consecutive ranges `start → c1 → c2 → …`.
///
/// Checkpoints must be strictly ascending above `start`.
pub fn partition_into_ranges(
    peer: PeerId,
    start: BlockHeader,
    checkpoints: Vec<BlockHeader>,
) -> Result<Vec<CheckpointRange>, SyncError> {
    let mut ranges = Vec::with_capacity(checkpoints.len());
    let mut previous = start;
    for checkpoint in checkpoints {
        ranges.push(CheckpointRange::new(peer, previous, checkpoint.clone())?);
        previous = checkpoint;
    }
    Ok(ranges)
}
