//! # Inbound Ports
//!
//! API exposed by the chain sync service.

use crate::domain::{SyncError, SyncOutcome, SyncStatus, SyncTarget};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Chain sync API.
#[async_trait]
pub trait ChainSyncApi: Send + Sync {
    /// Pick a target and sync from it until done, retargeted or failed.
    async fn sync_once(&self, shutdown: &CancellationToken) -> Result<SyncOutcome, SyncError>;

    /// Run sync rounds until `shutdown` fires or a fatal error occurs.
    async fn run(&self, shutdown: CancellationToken) -> Result<(), SyncError>;

    fn current_target(&self) -> Option<SyncTarget>;

    fn status(&self) -> SyncStatus;
}
