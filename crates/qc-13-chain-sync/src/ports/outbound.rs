//! # Outbound Ports
//!
//! Traits for the collaborators chain sync drives: peers, the wire, the
//! local chain and the block importer.

use crate::domain::{HeaderRequest, SyncError, ValidationModes};
use async_trait::async_trait;
use shared_types::{
    Block, BlockBody, BlockHeader, ChainHead, DisconnectReason, Hash, PeerChainState, PeerId,
    StorageError, TransactionReceipt,
};

/// Connected peers and what they advertise.
///
/// Peer state is updated by message handlers outside the sync core. A
/// `None` chain state means the peer is gone.
pub trait PeerDirectory: Send + Sync {
    /// Best peer by total difficulty, then height.
    fn best_peer(&self) -> Option<(PeerId, PeerChainState)>;

    fn chain_state(&self, peer: &PeerId) -> Option<PeerChainState>;

    fn is_connected(&self, peer: &PeerId) -> bool {
        self.chain_state(peer).is_some()
    }

    /// Drop the peer. The only hard action the sync core takes.
    fn disconnect(&self, peer: &PeerId, reason: DisconnectReason);

    fn connected_peers(&self) -> Vec<PeerId>;
}

/// Block data requests to a single peer.
///
/// Responses may be shorter than requested; implementations return what
/// the peer sent and let the caller judge it.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn download_headers(
        &self,
        peer: PeerId,
        request: HeaderRequest,
    ) -> Result<Vec<BlockHeader>, SyncError>;

    /// Bodies for `headers`, in order.
    async fn download_bodies(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Vec<BlockBody>, SyncError>;

    /// Receipts for `headers`, one list per block, in order.
    async fn download_receipts(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Vec<Vec<TransactionReceipt>>, SyncError>;
}

/// Read access to the local canonical chain.
pub trait LocalChain: Send + Sync {
    fn chain_head(&self) -> ChainHead;

    fn header_by_number(&self, number: u64) -> Result<Option<BlockHeader>, StorageError>;
}

/// Applies downloaded blocks. `false` means the block is invalid.
#[async_trait]
pub trait BlockImporter: Send + Sync {
    async fn import_block(&self, block: &Block, modes: ValidationModes) -> bool;

    async fn fast_import_block(
        &self,
        block: &Block,
        receipts: &[TransactionReceipt],
        modes: ValidationModes,
    ) -> bool;
}

pub trait WorldStateQuery: Send + Sync {
    fn is_world_state_available(&self, state_root: &Hash) -> bool;
}
