//! Value objects for transaction propagation configuration and reporting.

use serde::{Deserialize, Serialize};

/// Transaction propagation configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Seen hashes remembered per peer before the oldest are forgotten.
    pub max_tracked_seen_per_peer: usize,
    /// Hashes per outbound announcement message.
    pub max_batch_size: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_tracked_seen_per_peer: 200_000,
            max_batch_size: 4096,
        }
    }
}

impl PropagationConfig {
    /// Creates a minimal config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_tracked_seen_per_peer: 16,
            max_batch_size: 4,
        }
    }
}

/// Outcome of one broadcast round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Peers that received at least one hash.
    pub peers_reached: usize,
    /// Hashes sent across all peers.
    pub hashes_sent: usize,
    /// Peers that turned out to be gone.
    pub peers_dropped: usize,
    /// Hashes put back in a send queue after a failed send.
    pub hashes_deferred: usize,
}

/// Outcome of handling transactions received from a peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    pub accepted: usize,
    pub rejected: usize,
}
