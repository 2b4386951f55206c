//! # Blockchain Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Block, Hash, TransactionFate};
use shared_types::peers::PeerId;

/// A block was appended to the local chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAddedEvent {
    /// The imported block.
    pub block: Block,
    /// Whether the block became the new canonical head.
    pub is_new_head: bool,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockchainEvent {
    // =========================================================================
    // CHAIN
    // =========================================================================
    /// A block was imported into the local chain.
    BlockAdded(BlockAddedEvent),

    // =========================================================================
    // PEERS
    // =========================================================================
    /// A peer finished its handshake.
    PeerConnected(PeerId),

    /// A peer disconnected or was dropped.
    PeerDisconnected(PeerId),

    // =========================================================================
    // TRANSACTION POOL
    // =========================================================================
    /// Transactions entered the pending pool.
    TransactionsAdded(Vec<Hash>),

    /// A transaction left the pool.
    TransactionDropped {
        /// The transaction hash.
        hash: Hash,
        /// How it left.
        fate: TransactionFate,
    },

    // =========================================================================
    // CHAIN SYNC
    // =========================================================================
    /// A sync target was finalized.
    SyncTargetSelected {
        /// The target peer.
        peer: PeerId,
        /// Number of the common ancestor.
        common_ancestor: u64,
    },

    /// The current sync target was dropped.
    SyncTargetCleared {
        /// The former target peer.
        peer: PeerId,
    },
}

impl BlockchainEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BlockAdded(_) => EventTopic::Chain,
            Self::PeerConnected(_) | Self::PeerDisconnected(_) => EventTopic::Peers,
            Self::TransactionsAdded(_) | Self::TransactionDropped { .. } => {
                EventTopic::Transactions
            }
            Self::SyncTargetSelected { .. } | Self::SyncTargetCleared { .. } => EventTopic::Sync,
        }
    }

    /// Get the component that emits this event.
    #[must_use]
    pub fn source(&self) -> EventSource {
        match self {
            Self::BlockAdded(_) => EventSource::Chain,
            Self::PeerConnected(_) | Self::PeerDisconnected(_) => EventSource::PeerDirectory,
            Self::TransactionsAdded(_) | Self::TransactionDropped { .. } => {
                EventSource::TransactionPool
            }
            Self::SyncTargetSelected { .. } | Self::SyncTargetCleared { .. } => {
                EventSource::ChainSync
            }
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Block import events.
    Chain,
    /// Peer lifecycle events.
    Peers,
    /// Pending pool events.
    Transactions,
    /// Sync target events.
    Sync,
    /// All events (no filtering).
    All,
}

/// Components that publish to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    Chain,
    PeerDirectory,
    TransactionPool,
    ChainSync,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Sources to include. Empty means all sources.
    pub sources: Vec<EventSource>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            sources: Vec::new(),
        }
    }

    /// Create a filter for events from specific sources.
    #[must_use]
    pub fn from_sources(sources: Vec<EventSource>) -> Self {
        Self {
            topics: Vec::new(),
            sources,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BlockchainEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.sources.is_empty() || self.sources.contains(&event.source());

        topic_match && source_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::peers::NodeId;

    fn block_added() -> BlockchainEvent {
        BlockchainEvent::BlockAdded(BlockAddedEvent {
            block: Block::default(),
            is_new_head: true,
        })
    }

    #[test]
    fn test_event_topic_mapping() {
        let event = block_added();
        assert_eq!(event.topic(), EventTopic::Chain);
        assert_eq!(event.source(), EventSource::Chain);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&block_added()));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Peers]);

        assert!(filter.matches(&BlockchainEvent::PeerDisconnected(NodeId([1; 32]))));
        assert!(!filter.matches(&block_added()));
    }

    #[test]
    fn test_filter_by_source() {
        let filter = EventFilter::from_sources(vec![EventSource::TransactionPool]);

        let dropped = BlockchainEvent::TransactionDropped {
            hash: Hash::default(),
            fate: TransactionFate::Evicted,
        };
        assert!(filter.matches(&dropped));
        assert!(!filter.matches(&BlockchainEvent::PeerConnected(NodeId([1; 32]))));
    }

    #[test]
    fn test_sync_events_share_topic() {
        let selected = BlockchainEvent::SyncTargetSelected {
            peer: NodeId([2; 32]),
            common_ancestor: 10,
        };
        let cleared = BlockchainEvent::SyncTargetCleared {
            peer: NodeId([2; 32]),
        };
        assert_eq!(selected.topic(), EventTopic::Sync);
        assert_eq!(cleared.topic(), EventTopic::Sync);
    }
}
