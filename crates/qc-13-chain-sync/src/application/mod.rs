//! # Application Layer
//!
//! Orchestrates ports and algorithms: target selection, range generation,
//! the download/import pipeline and the sync driver.

pub mod pipeline;
pub mod ranges;
pub mod service;
pub mod target;

pub use pipeline::BlockPipeline;
pub use ranges::CheckpointRangeSource;
pub use service::ChainSyncService;
pub use target::{
    FastSyncTargetStrategy, FullSyncTargetStrategy, SyncTargetManager, SyncTargetStrategy,
};

use crate::domain::SyncError;
use crate::ports::{BlockImporter, BlockSource, LocalChain, PeerDirectory, WorldStateQuery};
use shared_types::PeerId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The outbound ports chain sync runs against.
#[derive(Clone)]
pub struct SyncPorts {
    pub peers: Arc<dyn PeerDirectory>,
    pub source: Arc<dyn BlockSource>,
    pub chain: Arc<dyn LocalChain>,
    pub importer: Arc<dyn BlockImporter>,
    pub world_state: Arc<dyn WorldStateQuery>,
}

/// Await a peer request, failing with `Timeout` after `limit`.
pub(crate) async fn with_timeout<T, F>(peer: PeerId, limit: Duration, request: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout { peer }),
    }
}
