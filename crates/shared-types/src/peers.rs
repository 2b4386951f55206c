//! # Peer-Facing Types
//!
//! Identity and advertised chain state of remote peers.

use crate::entities::{ChainHead, Hash, U256};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for a node in the network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub [u8; 32]);

/// A peer identifier (alias for `NodeId` in peer contexts).
pub type PeerId = NodeId;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str("…")
    }
}

/// What a peer last told us about its chain.
///
/// Updated by message handlers outside the sync core. The height estimate
/// only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PeerChainState {
    estimated_height: u64,
    total_difficulty: U256,
    best_block_hash: Hash,
}

impl PeerChainState {
    pub fn new(estimated_height: u64, total_difficulty: U256, best_block_hash: Hash) -> Self {
        Self {
            estimated_height,
            total_difficulty,
            best_block_hash,
        }
    }

    pub fn estimated_height(&self) -> u64 {
        self.estimated_height
    }

    pub fn total_difficulty(&self) -> U256 {
        self.total_difficulty
    }

    pub fn best_block_hash(&self) -> Hash {
        self.best_block_hash
    }

    /// Raise the height estimate. Lower values are ignored.
    pub fn update_height_estimate(&mut self, height: u64) {
        if height > self.estimated_height {
            self.estimated_height = height;
        }
    }

    /// Record a newly announced best block.
    ///
    /// Ignored unless it carries more total difficulty than the current one.
    pub fn update_for_announced_block(&mut self, hash: Hash, number: u64, total_difficulty: U256) {
        if total_difficulty > self.total_difficulty {
            self.total_difficulty = total_difficulty;
            self.best_block_hash = hash;
        }
        self.update_height_estimate(number);
    }

    /// Chain-quality order: total difficulty first, then height.
    pub fn chain_cmp(&self, other: &PeerChainState) -> Ordering {
        self.total_difficulty
            .cmp(&other.total_difficulty)
            .then(self.estimated_height.cmp(&other.estimated_height))
    }

    /// Whether this peer has anything the local chain lacks.
    ///
    /// A peer is *not* ahead when it has no more total difficulty and no
    /// greater height than `local`.
    pub fn is_ahead_of(&self, local: &ChainHead) -> bool {
        !(self.total_difficulty <= local.total_difficulty
            && self.estimated_height <= local.number())
    }
}

/// Reason sent to a peer when we drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// Peer cannot serve anything we need.
    UselessPeer,
    /// Peer sent data that violates the protocol.
    BreachOfProtocol,
    /// Peer did not answer in time.
    Timeout,
    /// Local node asked for the disconnect.
    Requested,
    /// Connection slots exhausted.
    TooManyPeers,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UselessPeer => "useless peer",
            Self::BreachOfProtocol => "breach of protocol",
            Self::Timeout => "timeout",
            Self::Requested => "requested",
            Self::TooManyPeers => "too many peers",
        };
        f.write_str(text)
    }
}
