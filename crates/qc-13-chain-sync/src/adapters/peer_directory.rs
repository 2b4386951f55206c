//! In-memory peer directory.
//!
//! Holds what each connected peer last advertised. Connects, updates and
//! disconnects are published on the bus under the `Peers` topic.

use crate::ports::PeerDirectory;
use parking_lot::{Mutex, RwLock};
use shared_bus::{BlockchainEvent, InMemoryEventBus};
use shared_types::{DisconnectReason, PeerChainState, PeerId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Disconnects kept for inspection.
pub const RECENT_DISCONNECTIONS: usize = 128;

/// Peer directory backed by a map.
#[derive(Default)]
pub struct InMemoryPeerDirectory {
    peers: RwLock<HashMap<PeerId, PeerChainState>>,
    /// Last [`RECENT_DISCONNECTIONS`] disconnects requested through the port.
    disconnections: Mutex<VecDeque<(PeerId, DisconnectReason)>>,
    bus: Option<Arc<InMemoryEventBus>>,
}

impl InMemoryPeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that publishes peer events on `bus`.
    pub fn with_bus(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    /// Register a peer after its handshake. Re-adding replaces its state.
    pub fn add_peer(&self, peer: PeerId, state: PeerChainState) {
        debug!(
            peer = %peer,
            height = state.estimated_height(),
            "Peer connected"
        );
        self.peers.write().insert(peer, state);
        self.publish(BlockchainEvent::PeerConnected(peer));
    }

    /// Apply an update from a status or block announcement.
    ///
    /// Returns `false` when the peer is not connected.
    pub fn update_peer<F>(&self, peer: &PeerId, update: F) -> bool
    where
        F: FnOnce(&mut PeerChainState),
    {
        match self.peers.write().get_mut(peer) {
            Some(state) => {
                update(state);
                true
            }
            None => false,
        }
    }

    /// Forget a peer whose connection closed.
    pub fn remove_peer(&self, peer: &PeerId) -> bool {
        let removed = self.peers.write().remove(peer).is_some();
        if removed {
            debug!(peer = %peer, "Peer removed");
            self.publish(BlockchainEvent::PeerDisconnected(*peer));
        }
        removed
    }

    /// Recent disconnects, oldest first.
    pub fn disconnections(&self) -> Vec<(PeerId, DisconnectReason)> {
        self.disconnections.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    fn publish(&self, event: BlockchainEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }
}

impl PeerDirectory for InMemoryPeerDirectory {
    fn best_peer(&self) -> Option<(PeerId, PeerChainState)> {
        self.peers
            .read()
            .iter()
            // Ties go to the lower id so selection is stable
            .max_by(|(a_id, a), (b_id, b)| a.chain_cmp(b).then_with(|| b_id.cmp(a_id)))
            .map(|(peer, state)| (*peer, state.clone()))
    }

    fn chain_state(&self, peer: &PeerId) -> Option<PeerChainState> {
        self.peers.read().get(peer).cloned()
    }

    fn disconnect(&self, peer: &PeerId, reason: DisconnectReason) {
        info!(peer = %peer, %reason, "Disconnecting peer");
        {
            let mut recent = self.disconnections.lock();
            if recent.len() == RECENT_DISCONNECTIONS {
                recent.pop_front();
            }
            recent.push_back((*peer, reason));
        }
        self.remove_peer(peer);
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.peers.read().keys().copied().collect();
        peers.sort();
        peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::{NodeId, U256};

    fn state(height: u64, td: u64) -> PeerChainState {
        PeerChainState::new(height, U256::from(td), [0; 32])
    }

    #[test]
    fn test_best_peer_prefers_difficulty() {
        let directory = InMemoryPeerDirectory::new();
        directory.add_peer(NodeId([1; 32]), state(500, 10));
        directory.add_peer(NodeId([2; 32]), state(100, 20));

        let (best, _) = directory.best_peer().unwrap();
        assert_eq!(best, NodeId([2; 32]));
    }

    #[test]
    fn test_best_peer_tie_goes_to_lower_id() {
        let directory = InMemoryPeerDirectory::new();
        directory.add_peer(NodeId([3; 32]), state(100, 20));
        directory.add_peer(NodeId([1; 32]), state(100, 20));

        assert_eq!(directory.best_peer().unwrap().0, NodeId([1; 32]));
    }

    #[test]
    fn test_update_unknown_peer_is_ignored() {
        let directory = InMemoryPeerDirectory::new();
        assert!(!directory.update_peer(&NodeId([9; 32]), |s| s.update_height_estimate(5)));
    }

    #[test]
    fn test_disconnect_record_is_bounded() {
        let directory = InMemoryPeerDirectory::new();
        for n in 0..RECENT_DISCONNECTIONS as u32 + 5 {
            let mut id = [0u8; 32];
            id[..4].copy_from_slice(&n.to_be_bytes());
            directory.disconnect(&NodeId(id), DisconnectReason::BreachOfProtocol);
        }

        let recent = directory.disconnections();
        assert_eq!(recent.len(), RECENT_DISCONNECTIONS);
        let mut oldest = [0u8; 32];
        oldest[..4].copy_from_slice(&5u32.to_be_bytes());
        assert_eq!(recent[0].0, NodeId(oldest));
    }

    #[test]
    fn test_disconnect_records_and_publishes() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Peers]));
        let directory = InMemoryPeerDirectory::with_bus(bus);
        let peer = NodeId([4; 32]);

        directory.add_peer(peer, state(10, 1));
        directory.disconnect(&peer, DisconnectReason::UselessPeer);

        assert!(directory.is_empty());
        assert!(!directory.is_connected(&peer));
        assert_eq!(
            directory.disconnections(),
            vec![(peer, DisconnectReason::UselessPeer)]
        );
        assert!(matches!(
            events.try_recv(),
            Ok(Some(BlockchainEvent::PeerConnected(p))) if p == peer
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(Some(BlockchainEvent::PeerDisconnected(p))) if p == peer
        ));
    }
}
