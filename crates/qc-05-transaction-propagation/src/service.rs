//! # Transaction Propagation Service
//!
//! Announces newly pending transaction hashes to connected peers, never
//! repeating a hash a peer already has.
//!
//! ## Flow
//!
//! ```text
//! pool ──TransactionsAdded──→ on_transactions_added ──→ per-peer send queues
//!                                                          │
//!                            broadcast_pending ←───────────┘
//!                                   │ batches of max_batch_size
//!                                   ↓
//!                           TransactionNetwork
//!
//! peer ──transactions──→ on_transactions_received ──→ mark seen ──→ MempoolGateway
//! ```

use crate::domain::{BroadcastStats, PeerTransactionTracker, PropagationConfig, ReceiveReport};
use crate::events::PropagationError;
use crate::ports::{MempoolGateway, TransactionNetwork, TransactionPropagationApi};
use shared_bus::{BlockchainEvent, Subscription};
use shared_types::{Hash, PeerId, SignedTransaction};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Transaction propagation service.
///
/// Thread-safe; share it across tasks via `Arc`.
pub struct TransactionPropagationService<N, M>
where
    N: TransactionNetwork,
    M: MempoolGateway,
{
    config: PropagationConfig,
    tracker: PeerTransactionTracker,
    network: Arc<N>,
    mempool: Arc<M>,
}

impl<N, M> TransactionPropagationService<N, M>
where
    N: TransactionNetwork,
    M: MempoolGateway,
{
    pub fn new(config: PropagationConfig, network: Arc<N>, mempool: Arc<M>) -> Self {
        Self {
            tracker: PeerTransactionTracker::new(config.max_tracked_seen_per_peer),
            config,
            network,
            mempool,
        }
    }

    pub fn tracker(&self) -> &PeerTransactionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Applies one bus event. Returns true if it was relevant.
    pub fn handle_event(&self, event: &BlockchainEvent) -> bool {
        match event {
            BlockchainEvent::TransactionsAdded(hashes) => {
                self.on_transactions_added(hashes);
                true
            }
            BlockchainEvent::PeerDisconnected(peer) => {
                self.on_peer_disconnected(peer);
                true
            }
            _ => false,
        }
    }

    /// Reacts to bus events and flushes send queues every `flush_interval`
    /// until the bus closes or `shutdown` fires.
    pub async fn run(
        self: Arc<Self>,
        mut subscription: Subscription,
        flush_interval: Duration,
        shutdown: CancellationToken,
    ) {
        let mut flush = tokio::time::interval(flush_interval);
        flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = flush.tick() => {
                    self.broadcast_pending();
                }
                event = subscription.recv() => match event {
                    Some(event) => {
                        self.handle_event(&event);
                    }
                    None => {
                        debug!("Event bus closed");
                        break;
                    }
                },
            }
        }
        info!("Transaction propagation stopped");
    }

    /// Sends `hashes` in batches, stopping at the first failure.
    ///
    /// Returns how many were delivered alongside the error, if any.
    fn send_to_peer(&self, peer: PeerId, hashes: &[Hash]) -> (usize, Option<PropagationError>) {
        let mut sent = 0;
        for batch in hashes.chunks(self.config.max_batch_size.max(1)) {
            if let Err(e) = self.network.send_transaction_hashes(peer, batch) {
                return (sent, Some(e));
            }
            sent += batch.len();
        }
        (sent, None)
    }
}

impl<N, M> TransactionPropagationApi for TransactionPropagationService<N, M>
where
    N: TransactionNetwork,
    M: MempoolGateway,
{
    fn on_transactions_added(&self, hashes: &[Hash]) {
        if hashes.is_empty() {
            return;
        }
        let peers = self.network.connected_peers();
        for peer in &peers {
            for hash in hashes {
                self.tracker.add_to_peer_send_queue(*peer, *hash);
            }
        }
        debug!(count = hashes.len(), peers = peers.len(), "Queued transactions");
    }

    fn broadcast_pending(&self) -> BroadcastStats {
        let mut stats = BroadcastStats::default();

        for peer in self.network.connected_peers() {
            let hashes = self.tracker.get_transactions_to_send_to_peer(&peer);
            if hashes.is_empty() {
                continue;
            }
            let (sent, failure) = self.send_to_peer(peer, &hashes);
            if sent > 0 {
                stats.peers_reached += 1;
                stats.hashes_sent += sent;
            }
            match failure {
                None => {}
                Some(PropagationError::PeerNotConnected(_)) => {
                    debug!(peer = %peer, "Peer gone during broadcast");
                    self.tracker.on_disconnect(&peer);
                    stats.peers_dropped += 1;
                }
                Some(e) => {
                    let unsent = &hashes[sent..];
                    warn!(
                        peer = %peer,
                        error = %e,
                        deferred = unsent.len(),
                        "Failed to announce transactions"
                    );
                    self.tracker.requeue(&peer, unsent);
                    stats.hashes_deferred += unsent.len();
                }
            }
        }

        if stats.hashes_sent > 0 {
            debug!(
                peers = stats.peers_reached,
                hashes = stats.hashes_sent,
                "Broadcast pending transactions"
            );
        }
        stats
    }

    fn on_transactions_received(
        &self,
        peer: PeerId,
        txs: Vec<SignedTransaction>,
    ) -> ReceiveReport {
        let mut report = ReceiveReport::default();
        self.tracker
            .mark_transactions_as_seen(peer, txs.iter().map(SignedTransaction::hash));

        for tx in txs {
            match self.mempool.submit_remote(tx) {
                Ok(_) => report.accepted += 1,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "Remote transaction not admitted");
                    report.rejected += 1;
                }
            }
        }
        report
    }

    fn on_hashes_announced(&self, peer: PeerId, hashes: &[Hash]) {
        self.tracker
            .mark_transactions_as_seen(peer, hashes.iter().copied());
    }

    fn on_peer_disconnected(&self, peer: &PeerId) {
        self.tracker.on_disconnect(peer);
        debug!(peer = %peer, "Dropped transaction tracking for peer");
    }
}
