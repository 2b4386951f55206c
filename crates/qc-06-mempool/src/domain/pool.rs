//! # Transaction Pool - Priority Index and Block Pruning
//!
//! ## Data Structures
//!
//! - `by_hash`: O(1) lookup by transaction hash
//! - `by_price`: O(log n) priority index (BTreeSet), last element evicted first
//! - `by_sender`: O(log n) nonce-ordered transactions per account
//! - `included`: bounded LRU of hashes already seen in imported blocks
//!
//! ## Invariants Enforced
//!
//! - Unique hash across pending and recently included (checked in `add()`)
//! - `len() <= max_pending_transactions` after every `add()`
//! - At most one entry per (sender, nonce); replacement needs a price bump

use super::entities::{
    Address, Hash, PendingTransaction, SignedTransaction, Timestamp, TransactionFate,
    TransactionOrigin, TransactionPoolConfig,
};
use super::errors::MempoolError;
use super::services::{is_sufficient_price_bump, next_nonces_in_block, total_gas};
use super::value_objects::{
    AddedTransaction, BlockUpdate, DroppedTransaction, PoolStatus, PricedTransaction,
    PrioritySnapshot,
};
use lru::LruCache;
use shared_types::Block;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::num::NonZeroUsize;

/// Bounded pool of pending transactions with multiple indices.
///
/// Not synchronized. Wrap it in a lock (see `TransactionPoolService`) to
/// make each operation atomic for concurrent readers.
#[derive(Debug)]
pub struct TransactionPool {
    /// Configuration.
    config: TransactionPoolConfig,

    /// All transactions indexed by hash.
    by_hash: HashMap<Hash, PendingTransaction>,

    /// Transactions ordered by priority, highest first.
    by_price: BTreeSet<PricedTransaction>,

    /// Transactions grouped by sender, ordered by nonce.
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,

    /// Hashes already included in imported blocks.
    included: LruCache<Hash, ()>,

    /// Sequence number handed to the next admitted transaction.
    next_sequence: u64,
}

impl TransactionPool {
    /// Creates a new empty transaction pool.
    pub fn new(config: TransactionPoolConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.included_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            by_hash: HashMap::new(),
            by_price: BTreeSet::new(),
            by_sender: HashMap::new(),
            included: LruCache::new(cache_size),
            next_sequence: 0,
        }
    }

    /// Creates a pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TransactionPoolConfig::default())
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &TransactionPoolConfig {
        &self.config
    }

    /// Returns the number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Gets a transaction by hash.
    pub fn get(&self, hash: &Hash) -> Option<&PendingTransaction> {
        self.by_hash.get(hash)
    }

    /// Checks if a transaction exists in the pool.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Whether the hash is pending or was recently included.
    pub fn is_known(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash) || self.included.contains(hash)
    }

    /// Adds a transaction that already passed validation.
    ///
    /// Inserts with the next sequence number. If that pushes the pool over
    /// capacity, the lowest-priority entry is evicted. When that entry is the
    /// new transaction itself, the add is reported as `PoolFull` and the pool
    /// is left as it was.
    ///
    /// # Errors
    /// - `AlreadyKnown` if the hash is pending or recently included
    /// - `ReplacementUnderpriced` if (sender, nonce) is taken at a price the
    ///   new transaction does not bump enough
    /// - `PoolFull` if the new transaction would be the first evicted
    pub fn add(
        &mut self,
        transaction: SignedTransaction,
        origin: TransactionOrigin,
        now: Timestamp,
    ) -> Result<AddedTransaction, MempoolError> {
        let hash = transaction.hash();
        if self.is_known(&hash) {
            return Err(MempoolError::AlreadyKnown(hash));
        }

        let tx = PendingTransaction::new(transaction, self.next_sequence, now, origin);

        let existing_hash = self
            .by_sender
            .get(&tx.sender)
            .and_then(|m| m.get(&tx.nonce))
            .copied();
        if let Some(existing_hash) = existing_hash {
            return self.replace(existing_hash, tx);
        }

        self.next_sequence += 1;
        self.insert_internal(tx);

        let mut dropped = None;
        if self.by_hash.len() > self.config.max_pending_transactions {
            let victim = self.evict_lowest()?;
            if victim == hash {
                return Err(MempoolError::PoolFull {
                    capacity: self.config.max_pending_transactions,
                });
            }
            dropped = Some(DroppedTransaction::new(victim, TransactionFate::Evicted));
        }

        Ok(AddedTransaction { hash, dropped })
    }

    /// Swaps a pending (sender, nonce) entry for a better-priced one.
    fn replace(
        &mut self,
        existing_hash: Hash,
        tx: PendingTransaction,
    ) -> Result<AddedTransaction, MempoolError> {
        let existing = self
            .by_hash
            .get(&existing_hash)
            .ok_or(MempoolError::TransactionNotFound(existing_hash))?;

        if !is_sufficient_price_bump(
            existing.gas_price,
            tx.gas_price,
            self.config.price_bump_percent,
        ) {
            return Err(MempoolError::ReplacementUnderpriced {
                old_price: existing.gas_price,
                new_price: tx.gas_price,
                min_bump_percent: self.config.price_bump_percent,
            });
        }

        self.remove_internal(&existing_hash)?;
        let hash = tx.hash;
        self.next_sequence += 1;
        self.insert_internal(tx);

        Ok(AddedTransaction {
            hash,
            dropped: Some(DroppedTransaction::new(
                existing_hash,
                TransactionFate::Replaced,
            )),
        })
    }

    /// Internal add without validation (assumes all checks passed).
    fn insert_internal(&mut self, tx: PendingTransaction) {
        self.by_price.insert(PricedTransaction::from(&tx));
        self.by_sender
            .entry(tx.sender)
            .or_default()
            .insert(tx.nonce, tx.hash);
        self.by_hash.insert(tx.hash, tx);
    }

    /// Removes the last entry of the priority index.
    fn evict_lowest(&mut self) -> Result<Hash, MempoolError> {
        let lowest = self
            .by_price
            .iter()
            .next_back()
            .map(|p| p.hash)
            .ok_or(MempoolError::PoolFull {
                capacity: self.config.max_pending_transactions,
            })?;
        self.remove_internal(&lowest)?;
        Ok(lowest)
    }

    /// Removes a transaction from the pool.
    pub fn remove(&mut self, hash: &Hash) -> Result<PendingTransaction, MempoolError> {
        self.remove_internal(hash)
    }

    /// Internal remove implementation.
    fn remove_internal(&mut self, hash: &Hash) -> Result<PendingTransaction, MempoolError> {
        let tx = self
            .by_hash
            .remove(hash)
            .ok_or(MempoolError::TransactionNotFound(*hash))?;

        self.by_price.remove(&PricedTransaction::from(&tx));

        if let Some(sender_txs) = self.by_sender.get_mut(&tx.sender) {
            sender_txs.remove(&tx.nonce);
            if sender_txs.is_empty() {
                self.by_sender.remove(&tx.sender);
            }
        }

        Ok(tx)
    }

    /// Applies an imported block.
    ///
    /// Removes every pending transaction the block includes, remembers their
    /// hashes, then drops pending entries whose nonce the block made stale.
    /// The on-chain nonce for an affected sender is the larger of
    /// `account_nonce(sender)` and the highest nonce the block used plus one.
    ///
    /// Applying the same block twice removes nothing the second time.
    pub fn on_block_added<F>(&mut self, block: &Block, account_nonce: F) -> BlockUpdate
    where
        F: Fn(&Address) -> u64,
    {
        let mut update = BlockUpdate::default();

        for tx in &block.body.transactions {
            let hash = tx.hash();
            self.included.put(hash, ());
            if self.remove_internal(&hash).is_ok() {
                update.included.push(hash);
            }
        }

        for (sender, block_next) in next_nonces_in_block(block) {
            let on_chain = account_nonce(&sender).max(block_next);
            let stale: Vec<Hash> = self
                .by_sender
                .get(&sender)
                .map(|m| m.range(..on_chain).map(|(_, h)| *h).collect())
                .unwrap_or_default();

            for hash in stale {
                if self.remove_internal(&hash).is_ok() {
                    update.invalidated.push(hash);
                }
            }
        }

        update
    }

    /// Drops every transaction older than the retention period.
    pub fn evict_expired(&mut self, now: Timestamp) -> Vec<DroppedTransaction> {
        let retention = self.config.retention_period_ms;
        let expired: Vec<Hash> = self
            .by_hash
            .values()
            .filter(|tx| tx.age(now) > retention)
            .map(|tx| tx.hash)
            .collect();

        expired
            .into_iter()
            .filter_map(|hash| self.remove_internal(&hash).ok())
            .map(|tx| DroppedTransaction::new(tx.hash, TransactionFate::Expired))
            .collect()
    }

    /// Iterates pending transactions from highest to lowest priority.
    pub fn iter_by_priority(&self) -> impl Iterator<Item = &PendingTransaction> + '_ {
        self.by_price
            .iter()
            .filter_map(move |priced| self.by_hash.get(&priced.hash))
    }

    /// Copies the pool in priority order.
    pub fn snapshot(&self, now: Timestamp) -> PrioritySnapshot {
        PrioritySnapshot::new(self.iter_by_priority().cloned().collect(), now)
    }

    /// Gets the highest priority transactions for block building.
    ///
    /// Returns transactions in priority order (highest gas price first).
    /// Respects nonce ordering for each sender.
    pub fn select_for_block(&self, max_count: usize, max_gas: u64) -> Vec<&PendingTransaction> {
        let mut result = Vec::new();
        let mut total_gas = 0u64;
        let mut sender_next_nonce: HashMap<Address, u64> = HashMap::new();

        for tx in self.iter_by_priority() {
            if result.len() >= max_count {
                break;
            }

            if total_gas.saturating_add(tx.gas_limit) > max_gas {
                continue;
            }

            let expected_nonce = sender_next_nonce
                .get(&tx.sender)
                .copied()
                .unwrap_or_else(|| {
                    // Lowest pending nonce for this sender
                    self.by_sender
                        .get(&tx.sender)
                        .and_then(|m| m.keys().next().copied())
                        .unwrap_or(tx.nonce)
                });

            if tx.nonce != expected_nonce {
                continue;
            }

            result.push(tx);
            total_gas = total_gas.saturating_add(tx.gas_limit);
            sender_next_nonce.insert(tx.sender, tx.nonce + 1);
        }

        result
    }

    /// Gets all transaction hashes for a sender in nonce order.
    pub fn sender_transactions(&self, sender: &Address) -> Vec<Hash> {
        self.by_sender
            .get(sender)
            .map(|m| m.values().copied().collect())
            .unwrap_or_default()
    }

    /// Gets the pool status.
    pub fn status(&self, now: Timestamp) -> PoolStatus {
        let oldest_age = self
            .by_hash
            .values()
            .map(|tx| tx.age(now))
            .max()
            .unwrap_or(0);

        PoolStatus {
            pending_count: self.by_hash.len(),
            local_count: self.by_hash.values().filter(|tx| tx.is_local()).count(),
            total_gas: total_gas(self.by_hash.values()),
            oldest_tx_age_ms: oldest_age,
            capacity: self.config.max_pending_transactions,
        }
    }
}
