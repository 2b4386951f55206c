//! # Event Publisher
//!
//! Publishing side of the bus. Events on a topic nobody subscribed to are
//! counted and dropped before they reach the channel, so they never push
//! interesting events out of a slow subscriber's buffer.

use crate::events::{BlockchainEvent, EventFilter, EventTopic};
use crate::subscriber::{EventSubscriber, Subscription, TopicInterest};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of subscribers it was queued for.
    async fn publish(&self, event: BlockchainEvent) -> usize;

    /// Events handed to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Single-process bus over a `tokio::sync::broadcast` channel.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BlockchainEvent>,
    interest: Arc<TopicInterest>,
    events_published: AtomicU64,
    events_unrouted: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is how far a subscriber may fall behind before it skips events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            interest: Arc::new(TopicInterest::default()),
            events_published: AtomicU64::new(0),
            events_unrouted: AtomicU64::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let keys = self.interest.register(&filter);
        let receiver = self.sender.subscribe();
        debug!(topics = ?keys, "New subscription created");
        Subscription::new(receiver, filter, self.interest.clone(), keys)
    }

    /// Live subscriptions of any kind.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live subscriptions that accept `topic`.
    #[must_use]
    pub fn interested_in(&self, topic: EventTopic) -> usize {
        self.interest.interested(topic)
    }

    /// Events dropped because no subscription wanted their topic.
    #[must_use]
    pub fn events_unrouted(&self) -> u64 {
        self.events_unrouted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish from synchronous code. Broadcast sends never block.
    pub fn emit(&self, event: BlockchainEvent) -> usize {
        let topic = event.topic();
        let source = event.source();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        if self.interest.interested(topic) == 0 {
            self.events_unrouted.fetch_add(1, Ordering::Relaxed);
            trace!(?topic, "No subscriber for topic");
            return 0;
        }

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?topic, ?source, receivers, "Event published");
                receivers
            }
            // Last subscriber dropped between the interest check and the send
            Err(_) => {
                self.events_unrouted.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BlockchainEvent) -> usize {
        self.emit(event)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BlockAddedEvent;
    use shared_types::entities::Block;
    use shared_types::peers::NodeId;

    fn block_added() -> BlockchainEvent {
        BlockchainEvent::BlockAdded(BlockAddedEvent {
            block: Block::default(),
            is_new_head: true,
        })
    }

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(block_added()).await, 0);
        assert_eq!(bus.events_published(), 1);
        assert_eq!(bus.events_unrouted(), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_interested_subscribers() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let _any_topic = bus.subscribe(EventFilter::topics(vec![EventTopic::All]));
        let _chain = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));

        assert_eq!(bus.publish(block_added()).await, 3);
        assert_eq!(bus.subscriber_count(), 3);
        assert_eq!(bus.interested_in(EventTopic::Chain), 3);
        assert_eq!(bus.interested_in(EventTopic::Peers), 2);
    }

    #[test]
    fn test_unwanted_topic_never_enters_channel() {
        let bus = InMemoryEventBus::new();
        let mut chain = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));

        assert_eq!(bus.emit(BlockchainEvent::PeerConnected(NodeId([1; 32]))), 0);
        assert_eq!(bus.events_unrouted(), 1);
        assert_eq!(bus.events_published(), 1);
        assert_eq!(chain.try_recv(), Ok(None));
    }

    #[test]
    fn test_unwanted_topics_do_not_cause_lag() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut chain = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));

        bus.emit(block_added());
        for n in 0..10u8 {
            bus.emit(BlockchainEvent::PeerDisconnected(NodeId([n; 32])));
        }

        assert!(matches!(chain.try_recv(), Ok(Some(BlockchainEvent::BlockAdded(_)))));
        assert_eq!(chain.missed(), 0);
    }

    #[test]
    fn test_dropping_subscription_withdraws_interest() {
        let bus = InMemoryEventBus::new();
        {
            let _peers = bus.subscribe(EventFilter::topics(vec![EventTopic::Peers]));
            assert_eq!(bus.interested_in(EventTopic::Peers), 1);
        }

        assert_eq!(bus.interested_in(EventTopic::Peers), 0);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.emit(BlockchainEvent::PeerConnected(NodeId([1; 32]))), 0);
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
    }
}
