//! # Domain Errors
//!
//! Error types for chain sync.
//!
//! | Class | Examples | Recovery |
//! |-------|----------|----------|
//! | Peer fault | bad headers, mismatched body, timeout | disconnect peer, drop target, retry |
//! | Transient | peer gone, network error, cancelled | drop target, retry |
//! | Fatal | storage failure, invalid config | returned to the node |

use shared_types::{DisconnectReason, PeerId, StorageError};
use thiserror::Error;

/// Chain sync error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Peer sent headers that do not form the requested chain.
    #[error("Invalid headers from {peer}: {reason}")]
    InvalidHeaders { peer: PeerId, reason: String },

    /// Body roots do not match the header.
    #[error("Body for block {number} from {peer} does not match its header")]
    InvalidBody { peer: PeerId, number: u64 },

    /// Receipts root does not match the header.
    #[error("Receipts for block {number} from {peer} do not match its header")]
    InvalidReceipts { peer: PeerId, number: u64 },

    /// Importer refused a downloaded block.
    #[error("Block {number} from {peer} failed import")]
    InvalidBlock { peer: PeerId, number: u64 },

    /// Peer returned nothing for data it claims to have.
    #[error("Empty response from {peer}")]
    EmptyResponse { peer: PeerId },

    /// Peer did not answer within the request timeout.
    #[error("Request to {peer} timed out")]
    Timeout { peer: PeerId },

    /// Peer left while we were talking to it.
    #[error("Peer {0} disconnected")]
    PeerDisconnected(PeerId),

    /// Transport failure not attributable to the peer's data.
    #[error("Network error with {peer}: {message}")]
    Network { peer: PeerId, message: String },

    /// Checkpoint bounds out of order.
    #[error("Invalid checkpoint range: {start}..{end}")]
    InvalidRange { start: u64, end: u64 },

    /// Target was dropped while work was in progress.
    #[error("Sync cancelled")]
    Cancelled,

    /// A download task died.
    #[error("Download task failed: {0}")]
    TaskFailed(String),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Reason to disconnect the offending peer, if the peer is at fault.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::InvalidHeaders { .. }
            | Self::InvalidBody { .. }
            | Self::InvalidReceipts { .. }
            | Self::InvalidBlock { .. } => Some(DisconnectReason::BreachOfProtocol),
            Self::EmptyResponse { .. } => Some(DisconnectReason::UselessPeer),
            Self::Timeout { .. } => Some(DisconnectReason::Timeout),
            _ => None,
        }
    }

    pub fn is_peer_fault(&self) -> bool {
        self.disconnect_reason().is_some()
    }

    /// Only storage and configuration failures stop the sync loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::InvalidConfig(_))
    }

    /// Peer the error is about.
    pub fn peer(&self) -> Option<PeerId> {
        match self {
            Self::InvalidHeaders { peer, .. }
            | Self::InvalidBody { peer, .. }
            | Self::InvalidReceipts { peer, .. }
            | Self::InvalidBlock { peer, .. }
            | Self::EmptyResponse { peer }
            | Self::Timeout { peer }
            | Self::Network { peer, .. } => Some(*peer),
            Self::PeerDisconnected(peer) => Some(*peer),
            _ => None,
        }
    }
}
