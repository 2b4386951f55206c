//! Event subscriber adapter for the transaction pool.
//!
//! Feeds block imports from the shared bus into the pool and runs the
//! periodic retention sweep.

use crate::ports::TransactionPoolApi;
use shared_bus::{BlockchainEvent, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Drives `on_block_added` and `evict_expired` from outside events.
pub struct BlockAddedSubscriber {
    pool: Arc<dyn TransactionPoolApi>,
    sweep_interval: Duration,
}

impl BlockAddedSubscriber {
    pub fn new(pool: Arc<dyn TransactionPoolApi>) -> Self {
        Self {
            pool,
            sweep_interval: Duration::from_secs(60),
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Applies one bus event. Returns true if it touched the pool.
    pub fn handle(&self, event: &BlockchainEvent) -> bool {
        match event {
            BlockchainEvent::BlockAdded(added) => {
                self.pool.on_block_added(&added.block);
                true
            }
            // Peer churn has no effect on pending transactions
            _ => false,
        }
    }

    /// Runs until the bus closes or `shutdown` fires.
    pub async fn run(self, mut subscription: Subscription, shutdown: CancellationToken) {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sweep.tick() => {
                    self.pool.evict_expired();
                }
                event = subscription.recv() => match event {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => {
                        debug!("Event bus closed");
                        break;
                    }
                },
            }
        }
        info!("Pool subscriber stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NoOpPublisher;
    use crate::domain::{TransactionOrigin, TransactionPoolConfig};
    use crate::ports::{BasicTransactionValidator, MockStateView, MockTimeSource};
    use crate::service::TransactionPoolService;
    use shared_bus::{BlockAddedEvent, EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::{Block, BlockBody, NodeId, SignedTransaction, U256};

    fn pool() -> Arc<dyn TransactionPoolApi> {
        Arc::new(TransactionPoolService::new(
            TransactionPoolConfig::for_testing(),
            Arc::new(BasicTransactionValidator {
                min_gas_price: U256::one(),
                ..Default::default()
            }),
            Arc::new(MockStateView::new()),
            Arc::new(MockTimeSource::new(0)),
            Arc::new(NoOpPublisher),
        ))
    }

    fn tx() -> SignedTransaction {
        SignedTransaction {
            from: [0xAA; 20],
            to: None,
            value: U256::zero(),
            nonce: 0,
            gas_price: U256::from(5u64),
            gas_limit: 21000,
            data: vec![],
            signature: [1u8; 64],
        }
    }

    fn block_added(tx: SignedTransaction) -> BlockchainEvent {
        BlockchainEvent::BlockAdded(BlockAddedEvent {
            block: Block {
                body: BlockBody {
                    transactions: vec![tx],
                    ommers: vec![],
                },
                ..Default::default()
            },
            is_new_head: true,
        })
    }

    #[test]
    fn test_peer_events_are_ignored() {
        let subscriber = BlockAddedSubscriber::new(pool());
        assert!(!subscriber.handle(&BlockchainEvent::PeerDisconnected(NodeId([1; 32]))));
    }

    #[tokio::test]
    async fn test_run_prunes_on_block_added() {
        let bus = Arc::new(InMemoryEventBus::new());
        let pool = pool();
        pool.add_transaction(tx(), TransactionOrigin::Remote).unwrap();

        let subscription = bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            BlockAddedSubscriber::new(pool.clone()).run(subscription, shutdown.clone()),
        );

        bus.emit(block_added(tx()));

        tokio::time::timeout(Duration::from_secs(1), async {
            while pool.size() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pool was not pruned");

        shutdown.cancel();
        handle.await.unwrap();
    }
}
