//! # Block Pipeline
//!
//! Downloads checkpoint ranges concurrently and imports them in order.
//!
//! ```text
//!  ranges ──spawn──→ [download R1] [download R2] ... (≤ max_inflight_ranges)
//!                         │             │
//!                         ↓ FIFO        ↓ waits for R1
//!                      import R1 ──→ import R2 ──→ ...
//! ```
//!
//! Each download fetches the range's headers, checks they chain from the
//! start boundary to the end boundary, then fetches bodies (and receipts in
//! fast mode) and checks them against the headers. Imports run on the
//! caller's task, block by block. Cancellation is observed between blocks,
//! so an import is never abandoned half way.

use crate::algorithms::{validate_body, validate_range_headers, validate_receipts};
use crate::application::with_timeout;
use crate::config::SyncConfig;
use crate::domain::{
    CheckpointRange, HeaderRequest, PipelineReport, SyncError, SyncMode, ValidationModes,
};
use crate::ports::{BlockImporter, BlockSource};
use shared_types::{Block, BlockBody, BlockHeader, PeerId, TransactionReceipt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A range with everything needed to import it.
struct DownloadedRange {
    range: CheckpointRange,
    blocks: Vec<Block>,
    /// One list per block in fast mode, empty in full mode.
    receipts: Vec<Vec<TransactionReceipt>>,
}

/// Concurrent download, sequential import.
pub struct BlockPipeline {
    config: SyncConfig,
    mode: SyncMode,
    modes: ValidationModes,
    source: Arc<dyn BlockSource>,
    importer: Arc<dyn BlockImporter>,
}

impl BlockPipeline {
    pub fn new(
        config: SyncConfig,
        mode: SyncMode,
        modes: ValidationModes,
        source: Arc<dyn BlockSource>,
        importer: Arc<dyn BlockImporter>,
    ) -> Self {
        Self {
            config,
            mode,
            modes,
            source,
            importer,
        }
    }

    /// Download and import `ranges`, which must be consecutive.
    ///
    /// Stops at the first failure. Blocks imported before it stay imported,
    /// nothing after it is imported, and outstanding downloads are
    /// cancelled.
    pub async fn run(
        &self,
        ranges: Vec<CheckpointRange>,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, SyncError> {
        let downloads = cancel.child_token();
        let _abort_downloads = downloads.clone().drop_guard();

        let mut pending = ranges.into_iter();
        let mut inflight: VecDeque<JoinHandle<Result<DownloadedRange, SyncError>>> =
            VecDeque::with_capacity(self.config.max_inflight_ranges);
        for range in pending.by_ref().take(self.config.max_inflight_ranges.max(1)) {
            inflight.push_back(self.spawn_download(range, &downloads));
        }

        let mut report = PipelineReport::default();
        while let Some(handle) = inflight.pop_front() {
            let downloaded = handle
                .await
                .map_err(|e| SyncError::TaskFailed(e.to_string()))??;

            if let Some(range) = pending.next() {
                inflight.push_back(self.spawn_download(range, &downloads));
            }
            self.import_range(downloaded, cancel, &mut report).await?;
        }
        Ok(report)
    }

    fn spawn_download(
        &self,
        range: CheckpointRange,
        token: &CancellationToken,
    ) -> JoinHandle<Result<DownloadedRange, SyncError>> {
        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let mode = self.mode;
        let token = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => Err(SyncError::Cancelled),
                result = download_range(source.as_ref(), range, &config, mode) => result,
            }
        })
    }

    async fn import_range(
        &self,
        downloaded: DownloadedRange,
        cancel: &CancellationToken,
        report: &mut PipelineReport,
    ) -> Result<(), SyncError> {
        let peer = downloaded.range.sync_target();
        let mut receipts = downloaded.receipts.into_iter();

        for block in downloaded.blocks {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let imported = match self.mode {
                SyncMode::Full => self.importer.import_block(&block, self.modes).await,
                SyncMode::Fast => {
                    let block_receipts = receipts.next().unwrap_or_default();
                    self.importer
                        .fast_import_block(&block, &block_receipts, self.modes)
                        .await
                }
            };
            if !imported {
                warn!(peer = %peer, number = block.number(), "Block failed import");
                return Err(SyncError::InvalidBlock {
                    peer,
                    number: block.number(),
                });
            }

            report.blocks_imported += 1;
            report.last_imported = Some(block.header);
        }

        report.ranges_imported += 1;
        debug!(peer = %peer, range = %downloaded.range, "Imported range");
        Ok(())
    }
}

async fn download_range(
    source: &dyn BlockSource,
    range: CheckpointRange,
    config: &SyncConfig,
    mode: SyncMode,
) -> Result<DownloadedRange, SyncError> {
    let peer = range.sync_target();

    let headers = download_range_headers(source, &range, config).await?;
    validate_range_headers(peer, range.start(), &headers, range.end())?;

    let bodies = download_bodies(source, peer, &headers, config).await?;
    let receipts = match mode {
        SyncMode::Full => Vec::new(),
        SyncMode::Fast => download_receipts(source, peer, &headers, config).await?,
    };

    let blocks = headers
        .into_iter()
        .zip(bodies)
        .map(|(header, body)| Block::new(header, body))
        .collect();

    Ok(DownloadedRange {
        range,
        blocks,
        receipts,
    })
}

/// Headers above `start` up to and including `end`.
///
/// For an open range, up to one span of headers.
async fn download_range_headers(
    source: &dyn BlockSource,
    range: &CheckpointRange,
    config: &SyncConfig,
) -> Result<Vec<BlockHeader>, SyncError> {
    let peer = range.sync_target();
    let first = range.start().number + 1;

    let Some(end) = range.end() else {
        let mut headers = request_headers(
            source,
            peer,
            HeaderRequest::contiguous(first, config.checkpoint_span),
            config,
        )
        .await?;
        if headers.is_empty() {
            return Err(SyncError::EmptyResponse { peer });
        }
        headers.truncate(config.checkpoint_span as usize);
        return Ok(headers);
    };

    let mut headers = Vec::with_capacity(end.number.saturating_sub(first) as usize + 1);
    let mut next = first;
    while next < end.number {
        let count = end.number - next;
        let batch =
            request_headers(source, peer, HeaderRequest::contiguous(next, count), config).await?;
        if batch.is_empty() {
            return Err(SyncError::EmptyResponse { peer });
        }
        if batch.len() as u64 > count {
            return Err(SyncError::InvalidHeaders {
                peer,
                reason: format!("asked for {count} headers, got {}", batch.len()),
            });
        }
        next += batch.len() as u64;
        headers.extend(batch);
    }
    headers.push(end.clone());
    Ok(headers)
}

async fn request_headers(
    source: &dyn BlockSource,
    peer: PeerId,
    request: HeaderRequest,
    config: &SyncConfig,
) -> Result<Vec<BlockHeader>, SyncError> {
    with_timeout(
        peer,
        config.request_timeout(),
        source.download_headers(peer, request),
    )
    .await
}

/// Bodies in batches, re-requesting whatever a short answer left out.
async fn download_bodies(
    source: &dyn BlockSource,
    peer: PeerId,
    headers: &[BlockHeader],
    config: &SyncConfig,
) -> Result<Vec<BlockBody>, SyncError> {
    let mut bodies = Vec::with_capacity(headers.len());
    while bodies.len() < headers.len() {
        let end = (bodies.len() + config.body_batch_size).min(headers.len());
        let wanted = &headers[bodies.len()..end];

        let batch = with_timeout(
            peer,
            config.request_timeout(),
            source.download_bodies(peer, wanted),
        )
        .await?;
        if batch.is_empty() {
            return Err(SyncError::EmptyResponse { peer });
        }
        for (header, body) in wanted.iter().zip(batch) {
            validate_body(peer, header, &body)?;
            bodies.push(body);
        }
    }
    Ok(bodies)
}

async fn download_receipts(
    source: &dyn BlockSource,
    peer: PeerId,
    headers: &[BlockHeader],
    config: &SyncConfig,
) -> Result<Vec<Vec<TransactionReceipt>>, SyncError> {
    let mut receipts = Vec::with_capacity(headers.len());
    while receipts.len() < headers.len() {
        let end = (receipts.len() + config.body_batch_size).min(headers.len());
        let wanted = &headers[receipts.len()..end];

        let batch = with_timeout(
            peer,
            config.request_timeout(),
            source.download_receipts(peer, wanted),
        )
        .await?;
        if batch.is_empty() {
            return Err(SyncError::EmptyResponse { peer });
        }
        for (header, block_receipts) in wanted.iter().zip(batch) {
            validate_receipts(peer, header, &block_receipts)?;
            receipts.push(block_receipts);
        }
    }
    Ok(receipts)
}
