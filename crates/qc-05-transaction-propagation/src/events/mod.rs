//! Error types for transaction propagation.

use shared_types::PeerId;
use thiserror::Error;

/// Transaction propagation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    #[error("peer not connected: {0}")]
    PeerNotConnected(PeerId),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("rejected by pool: {0}")]
    RejectedByPool(String),
}
