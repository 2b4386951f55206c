//! Inbound port (API) for transaction propagation.

use crate::domain::{BroadcastStats, ReceiveReport};
use shared_types::{Hash, PeerId, SignedTransaction};

/// Primary API of the propagation service.
pub trait TransactionPropagationApi: Send + Sync {
    /// Queue newly pending hashes for every connected peer.
    fn on_transactions_added(&self, hashes: &[Hash]);

    /// Send every peer what it has queued and not yet seen.
    fn broadcast_pending(&self) -> BroadcastStats;

    /// Handle full transactions a peer sent us.
    fn on_transactions_received(&self, peer: PeerId, txs: Vec<SignedTransaction>)
        -> ReceiveReport;

    /// Handle hash announcements from a peer.
    fn on_hashes_announced(&self, peer: PeerId, hashes: &[Hash]);

    fn on_peer_disconnected(&self, peer: &PeerId);
}
