//! Per-peer record of which transaction hashes were exchanged.
//!
//! Advisory only: losing an entry means a hash may be sent twice, never
//! that a transaction is lost.

use lru::LruCache;
use parking_lot::RwLock;
use shared_types::{Hash, PeerId};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

struct PeerState {
    /// Hashes the peer sent us or we sent it.
    seen: LruCache<Hash, ()>,
    /// Hashes waiting for the next broadcast, in arrival order.
    send_queue: Vec<Hash>,
    queued: HashSet<Hash>,
}

impl PeerState {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            seen: LruCache::new(capacity),
            send_queue: Vec::new(),
            queued: HashSet::new(),
        }
    }
}

/// Tracks seen hashes and pending sends for every connected peer.
pub struct PeerTransactionTracker {
    peers: RwLock<HashMap<PeerId, PeerState>>,
    max_seen_per_peer: NonZeroUsize,
}

impl PeerTransactionTracker {
    pub fn new(max_seen_per_peer: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            max_seen_per_peer: NonZeroUsize::new(max_seen_per_peer).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Record that `peer` already knows these hashes.
    pub fn mark_transactions_as_seen<I>(&self, peer: PeerId, hashes: I)
    where
        I: IntoIterator<Item = Hash>,
    {
        let capacity = self.max_seen_per_peer;
        let mut peers = self.peers.write();
        let state = peers
            .entry(peer)
            .or_insert_with(|| PeerState::new(capacity));
        for hash in hashes {
            state.seen.put(hash, ());
        }
    }

    /// Queue a hash for the next broadcast to `peer`, unless it already has it.
    pub fn add_to_peer_send_queue(&self, peer: PeerId, hash: Hash) {
        let capacity = self.max_seen_per_peer;
        let mut peers = self.peers.write();
        let state = peers
            .entry(peer)
            .or_insert_with(|| PeerState::new(capacity));
        if state.seen.contains(&hash) || !state.queued.insert(hash) {
            return;
        }
        state.send_queue.push(hash);
    }

    /// Claim everything queued for `peer` that it has not seen.
    ///
    /// The returned hashes are marked as seen, so a second call right after
    /// returns nothing. Hand undelivered ones back through [`Self::requeue`].
    pub fn get_transactions_to_send_to_peer(&self, peer: &PeerId) -> Vec<Hash> {
        let mut peers = self.peers.write();
        let Some(state) = peers.get_mut(peer) else {
            return Vec::new();
        };

        let queue = std::mem::take(&mut state.send_queue);
        state.queued.clear();

        let mut to_send = Vec::with_capacity(queue.len());
        for hash in queue {
            if state.seen.contains(&hash) {
                continue;
            }
            state.seen.put(hash, ());
            to_send.push(hash);
        }
        to_send
    }

    /// Put claimed hashes back at the front of the queue after a failed send.
    ///
    /// No-op if the peer has been forgotten meanwhile.
    pub fn requeue(&self, peer: &PeerId, hashes: &[Hash]) {
        let mut peers = self.peers.write();
        let Some(state) = peers.get_mut(peer) else {
            return;
        };

        let mut restored = Vec::with_capacity(hashes.len() + state.send_queue.len());
        for hash in hashes {
            state.seen.pop(hash);
            if state.queued.insert(*hash) {
                restored.push(*hash);
            }
        }
        restored.append(&mut state.send_queue);
        state.send_queue = restored;
    }

    pub fn has_peer_seen(&self, peer: &PeerId, hash: &Hash) -> bool {
        self.peers
            .read()
            .get(peer)
            .is_some_and(|state| state.seen.contains(hash))
    }

    /// Forget everything about `peer`.
    pub fn on_disconnect(&self, peer: &PeerId) {
        self.peers.write().remove(peer);
    }

    pub fn tracked_peers(&self) -> usize {
        self.peers.read().len()
    }

    pub fn queued_for(&self, peer: &PeerId) -> usize {
        self.peers
            .read()
            .get(peer)
            .map_or(0, |state| state.send_queue.len())
    }
}
