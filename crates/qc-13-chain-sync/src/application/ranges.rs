//! # Checkpoint Range Source
//!
//! Produces checkpoint ranges for one sync target, batch by batch.
//!
//! Each batch asks the peer for a skeleton of headers `span` blocks apart
//! starting just above the frontier. Every boundary of an emitted range is
//! a header the peer actually served.

use crate::algorithms::{checkpoint_numbers, partition_into_ranges};
use crate::application::with_timeout;
use crate::config::SyncConfig;
use crate::domain::{CheckpointRange, HeaderRequest, SyncError, SyncTarget};
use crate::ports::BlockSource;
use shared_types::{BlockHeader, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Stateful range generator over `(frontier, target_height]`.
pub struct CheckpointRangeSource {
    peer: PeerId,
    frontier: BlockHeader,
    target_height: u64,
    span: u64,
    max_checkpoints: usize,
    timeout: Duration,
    source: Arc<dyn BlockSource>,
}

impl CheckpointRangeSource {
    pub fn new(
        config: &SyncConfig,
        source: Arc<dyn BlockSource>,
        target: &SyncTarget,
        target_height: u64,
    ) -> Self {
        Self {
            peer: target.peer(),
            frontier: target.common_ancestor().clone(),
            target_height,
            span: config.checkpoint_span.max(1),
            max_checkpoints: config.max_checkpoints_per_request,
            timeout: config.request_timeout(),
            source,
        }
    }

    /// Highest block the emitted ranges reach.
    pub fn frontier(&self) -> &BlockHeader {
        &self.frontier
    }

    pub fn is_exhausted(&self) -> bool {
        self.frontier.number >= self.target_height
    }

    /// Move the frontier after an open-ended range was imported.
    pub fn advance_to(&mut self, header: BlockHeader) {
        if header.number > self.frontier.number {
            self.frontier = header;
        }
    }

    /// Next ranges above the frontier. Empty once the target is reached.
    pub async fn next_batch(&mut self) -> Result<Vec<CheckpointRange>, SyncError> {
        if self.is_exhausted() {
            return Ok(Vec::new());
        }

        let numbers = checkpoint_numbers(
            self.frontier.number,
            self.target_height,
            self.span,
            self.max_checkpoints,
        );
        let checkpoints = self.fetch_checkpoints(&numbers).await?;

        if checkpoints.is_empty() {
            debug!(
                peer = %self.peer,
                from = self.frontier.number,
                "No checkpoints served, falling back to an open range"
            );
            return Ok(vec![CheckpointRange::open(self.peer, self.frontier.clone())]);
        }

        let ranges = partition_into_ranges(self.peer, self.frontier.clone(), checkpoints)?;
        if let Some(end) = ranges.last().and_then(CheckpointRange::end) {
            self.frontier = end.clone();
        }
        debug!(
            peer = %self.peer,
            ranges = ranges.len(),
            frontier = self.frontier.number,
            "Generated checkpoint ranges"
        );
        Ok(ranges)
    }

    /// Fetch the headers at `numbers`. A short answer yields a prefix.
    async fn fetch_checkpoints(&self, numbers: &[u64]) -> Result<Vec<BlockHeader>, SyncError> {
        let base = self.frontier.number;
        let regular = numbers
            .iter()
            .zip(1u64..)
            .take_while(|(number, k)| **number == base + k * self.span)
            .count();

        let mut headers = Vec::with_capacity(numbers.len());
        if regular > 0 {
            let request = HeaderRequest {
                start: numbers[0],
                count: regular as u64,
                skip: self.span - 1,
            };
            let response = self.request(request).await?;
            if response.len() > regular {
                return Err(self.invalid(format!(
                    "asked for {regular} checkpoints, got {}",
                    response.len()
                )));
            }
            for (header, expected) in response.into_iter().zip(numbers) {
                if header.number != *expected {
                    return Err(self.invalid(format!(
                        "asked for checkpoint {expected}, got {}",
                        header.number
                    )));
                }
                headers.push(header);
            }
            if headers.len() < regular {
                return Ok(headers);
            }
        }

        // Final checkpoint clipped to the target height
        if let Some(&last) = numbers.get(regular) {
            match self.request(HeaderRequest::single(last)).await?.into_iter().next() {
                Some(header) if header.number == last => headers.push(header),
                Some(header) => {
                    return Err(self.invalid(format!(
                        "asked for checkpoint {last}, got {}",
                        header.number
                    )))
                }
                None => {}
            }
        }
        Ok(headers)
    }

    async fn request(&self, request: HeaderRequest) -> Result<Vec<BlockHeader>, SyncError> {
        with_timeout(
            self.peer,
            self.timeout,
            self.source.download_headers(self.peer, request),
        )
        .await
    }

    fn invalid(&self, reason: String) -> SyncError {
        SyncError::InvalidHeaders {
            peer: self.peer,
            reason,
        }
    }
}
