//! # Event Subscriber
//!
//! Subscriptions and the per-topic interest registry the bus consults
//! before queueing an event.

use crate::events::{BlockchainEvent, EventFilter, EventTopic};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Anything that hands out filtered subscriptions.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// Live subscription count per topic.
///
/// A subscriber without a topic restriction is counted under
/// [`EventTopic::All`] and wants every topic.
#[derive(Debug, Default)]
pub(crate) struct TopicInterest {
    counts: Mutex<HashMap<EventTopic, usize>>,
}

impl TopicInterest {
    /// Registry keys for a filter, deduplicated.
    fn keys(filter: &EventFilter) -> Vec<EventTopic> {
        if filter.topics.is_empty() || filter.topics.contains(&EventTopic::All) {
            return vec![EventTopic::All];
        }
        let mut keys = filter.topics.clone();
        keys.sort_by_key(|topic| *topic as u8);
        keys.dedup();
        keys
    }

    pub(crate) fn register(&self, filter: &EventFilter) -> Vec<EventTopic> {
        let keys = Self::keys(filter);
        let mut counts = self.counts.lock();
        for key in &keys {
            *counts.entry(*key).or_insert(0) += 1;
        }
        keys
    }

    fn release(&self, keys: &[EventTopic]) {
        let mut counts = self.counts.lock();
        for key in keys {
            if let Some(count) = counts.get_mut(key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(key);
                }
            }
        }
    }

    /// Subscriptions that would accept an event on `topic`.
    pub(crate) fn interested(&self, topic: EventTopic) -> usize {
        let counts = self.counts.lock();
        let wildcard = counts.get(&EventTopic::All).copied().unwrap_or(0);
        if topic == EventTopic::All {
            return wildcard;
        }
        wildcard + counts.get(&topic).copied().unwrap_or(0)
    }
}

/// A filtered view of the bus.
///
/// Dropping it withdraws its topics from the bus registry.
pub struct Subscription {
    receiver: broadcast::Receiver<BlockchainEvent>,
    filter: EventFilter,
    interest: Arc<TopicInterest>,
    /// Registry keys this subscription holds.
    keys: Vec<EventTopic>,
    /// Events skipped because this subscriber fell behind.
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<BlockchainEvent>,
        filter: EventFilter,
        interest: Arc<TopicInterest>,
        keys: Vec<EventTopic>,
    ) -> Self {
        Self {
            receiver,
            filter,
            interest,
            keys,
            missed: 0,
        }
    }

    fn note_lag(&mut self, count: u64) {
        self.missed = self.missed.saturating_add(count);
        warn!(lagged = count, total = self.missed, topics = ?self.keys, "Subscriber fell behind");
    }

    /// Next matching event, or `None` once the bus is gone.
    ///
    /// Events lost to lag are skipped and counted in [`Self::missed`].
    pub async fn recv(&mut self) -> Option<BlockchainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => self.note_lag(count),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    ///
    /// # Errors
    /// [`SubscriptionError::Closed`] once the bus is gone.
    pub fn try_recv(&mut self) -> Result<Option<BlockchainEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(count)) => self.note_lag(count),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events this subscriber never saw because it lagged.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.interest.release(&self.keys);
        debug!(topics = ?self.keys, "Subscription dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BlockAddedEvent;
    use crate::publisher::InMemoryEventBus;
    use shared_types::entities::Block;
    use shared_types::peers::NodeId;
    use std::time::Duration;
    use tokio::time::timeout;

    fn block_added() -> BlockchainEvent {
        BlockchainEvent::BlockAdded(BlockAddedEvent {
            block: Block::default(),
            is_new_head: true,
        })
    }

    #[tokio::test]
    async fn test_filtered_recv_skips_other_topics() {
        let bus = InMemoryEventBus::new();
        let mut chain = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));
        let _peers = bus.subscribe(EventFilter::topics(vec![EventTopic::Peers]));

        bus.emit(BlockchainEvent::PeerConnected(NodeId([3; 32])));
        bus.emit(block_added());

        let received = timeout(Duration::from_millis(100), chain.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert!(matches!(received, BlockchainEvent::BlockAdded(_)));
    }

    #[test]
    fn test_try_recv_empty_then_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert_eq!(sub.try_recv(), Ok(None));

        bus.emit(block_added());
        assert!(matches!(sub.try_recv(), Ok(Some(BlockchainEvent::BlockAdded(_)))));
    }

    #[test]
    fn test_try_recv_reports_closed_bus() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);

        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }

    #[test]
    fn test_lag_is_counted() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());
        for n in 0..5u8 {
            bus.emit(BlockchainEvent::PeerConnected(NodeId([n; 32])));
        }

        // Only the newest two survive
        assert_eq!(
            sub.try_recv(),
            Ok(Some(BlockchainEvent::PeerConnected(NodeId([3; 32]))))
        );
        assert_eq!(sub.missed(), 3);
    }

    #[test]
    fn test_interest_tracks_drops() {
        let interest = Arc::new(TopicInterest::default());
        let keys = interest.register(&EventFilter::topics(vec![
            EventTopic::Peers,
            EventTopic::Peers,
            EventTopic::Sync,
        ]));
        assert_eq!(keys, vec![EventTopic::Peers, EventTopic::Sync]);
        assert_eq!(interest.interested(EventTopic::Peers), 1);
        assert_eq!(interest.interested(EventTopic::Chain), 0);

        let wildcard = interest.register(&EventFilter::all());
        assert_eq!(interest.interested(EventTopic::Chain), 1);
        assert_eq!(interest.interested(EventTopic::Peers), 2);

        interest.release(&keys);
        interest.release(&wildcard);
        assert_eq!(interest.interested(EventTopic::Peers), 0);
        assert!(interest.counts.lock().is_empty());
    }
}
