//! # Transaction Pool Service
//!
//! Thread-safe front of [`TransactionPool`]. Validation runs before the
//! write lock is taken and bus notifications go out after it is released,
//! so readers are never blocked on either.

use crate::adapters::PoolEventPublisher;
use crate::domain::{
    BlockUpdate, DroppedTransaction, Hash, InvalidReason, MempoolError, PendingTransaction,
    PoolStatus, PrioritySnapshot, SignedTransaction, TransactionOrigin, TransactionPool,
    TransactionPoolConfig,
};
use crate::ports::{AccountStateView, TimeSource, TransactionPoolApi, TransactionValidator};
use parking_lot::RwLock;
use shared_types::Block;
use std::sync::Arc;
use tracing::{debug, info};

/// Concurrent pending-transaction pool.
pub struct TransactionPoolService<V, S, T, P>
where
    V: TransactionValidator,
    S: AccountStateView,
    T: TimeSource,
    P: PoolEventPublisher,
{
    pool: RwLock<TransactionPool>,
    validator: Arc<V>,
    state: Arc<S>,
    time: Arc<T>,
    publisher: Arc<P>,
}

impl<V, S, T, P> TransactionPoolService<V, S, T, P>
where
    V: TransactionValidator,
    S: AccountStateView,
    T: TimeSource,
    P: PoolEventPublisher,
{
    pub fn new(
        config: TransactionPoolConfig,
        validator: Arc<V>,
        state: Arc<S>,
        time: Arc<T>,
        publisher: Arc<P>,
    ) -> Self {
        Self {
            pool: RwLock::new(TransactionPool::new(config)),
            validator,
            state,
            time,
            publisher,
        }
    }

    fn publish_dropped<I>(&self, dropped: I)
    where
        I: IntoIterator<Item = DroppedTransaction>,
    {
        for d in dropped {
            self.publisher.publish_dropped(d);
        }
    }
}

impl<V, S, T, P> TransactionPoolApi for TransactionPoolService<V, S, T, P>
where
    V: TransactionValidator,
    S: AccountStateView,
    T: TimeSource,
    P: PoolEventPublisher,
{
    fn add_transaction(
        &self,
        tx: SignedTransaction,
        origin: TransactionOrigin,
    ) -> Result<Hash, MempoolError> {
        let hash = tx.hash();
        if self.pool.read().is_known(&hash) {
            return Err(MempoolError::AlreadyKnown(hash));
        }

        self.validator.validate(&tx, self.state.as_ref())?;

        let added = {
            let mut pool = self.pool.write();
            // A block may have landed since validation
            let expected = self.state.account_nonce(&tx.sender());
            if tx.nonce < expected {
                return Err(InvalidReason::NonceTooLow {
                    expected,
                    actual: tx.nonce,
                }
                .into());
            }
            pool.add(tx, origin, self.time.now())?
        };

        debug!(hash = ?&added.hash[..4], ?origin, "Transaction added to pool");
        self.publisher.publish_added(&[added.hash]);
        self.publish_dropped(added.dropped);
        Ok(added.hash)
    }

    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<PendingTransaction> {
        self.pool.read().get(hash).cloned()
    }

    fn size(&self) -> usize {
        self.pool.read().len()
    }

    fn priority_snapshot(&self) -> PrioritySnapshot {
        self.pool.read().snapshot(self.time.now())
    }

    fn on_block_added(&self, block: &Block) -> BlockUpdate {
        let update = {
            let state = &self.state;
            self.pool
                .write()
                .on_block_added(block, |address| state.account_nonce(address))
        };

        if !update.is_empty() {
            info!(
                block = block.number(),
                included = update.included.len(),
                invalidated = update.invalidated.len(),
                "Pruned pool after block import"
            );
        }
        self.publish_dropped(update.dropped());
        update
    }

    fn select_for_block(&self, max_count: usize, max_gas: u64) -> Vec<PendingTransaction> {
        self.pool
            .read()
            .select_for_block(max_count, max_gas)
            .into_iter()
            .cloned()
            .collect()
    }

    fn evict_expired(&self) -> Vec<DroppedTransaction> {
        let dropped = self.pool.write().evict_expired(self.time.now());
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "Expired pending transactions");
        }
        self.publish_dropped(dropped.iter().copied());
        dropped
    }

    fn status(&self) -> PoolStatus {
        self.pool.read().status(self.time.now())
    }
}
