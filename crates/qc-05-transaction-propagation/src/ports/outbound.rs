//! Outbound ports (SPI) for transaction propagation.

use crate::events::PropagationError;
use shared_types::{Hash, PeerId, SignedTransaction};

/// Wire access to connected peers.
pub trait TransactionNetwork: Send + Sync {
    fn connected_peers(&self) -> Vec<PeerId>;

    /// Announce pending transaction hashes to one peer.
    ///
    /// Returns `PeerNotConnected` if the peer went away.
    fn send_transaction_hashes(&self, peer: PeerId, hashes: &[Hash])
        -> Result<(), PropagationError>;
}

/// Submits transactions received from the network to the pool.
pub trait MempoolGateway: Send + Sync {
    fn submit_remote(&self, tx: SignedTransaction) -> Result<Hash, PropagationError>;
}
