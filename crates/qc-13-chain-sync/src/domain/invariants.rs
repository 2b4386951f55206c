//! # Domain Invariants
//!
//! Checks over checkpoint ranges.

use crate::domain::CheckpointRange;

/// Ranges partition `(from, to]` with no gap and no overlap.
///
/// Every range but the last must be closed. An open last range covers
/// everything above its start.
pub fn ranges_cover(ranges: &[CheckpointRange], from: u64, to: u64) -> bool {
    if from >= to {
        return ranges.is_empty();
    }
    let Some(first) = ranges.first() else {
        return false;
    };
    if first.start().number != from {
        return false;
    }

    let mut cursor = first.start().clone();
    for (index, range) in ranges.iter().enumerate() {
        if range.start() != &cursor {
            return false;
        }
        match range.end() {
            Some(end) => cursor = end.clone(),
            None => return index == ranges.len() - 1,
        }
    }
    cursor.number == to
}

/// Every closed range spans at most `max_span` blocks.
pub fn ranges_within_span(ranges: &[CheckpointRange], max_span: u64) -> bool {
    ranges
        .iter()
        .filter_map(CheckpointRange::segment_length_exclusive)
        .all(|inner| inner < max_span)
}
