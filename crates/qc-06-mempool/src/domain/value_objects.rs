//! Value objects for the transaction pool.
//!
//! Immutable types used for ordering, reporting and admission results.

use super::entities::{Hash, PendingTransaction, Timestamp, TransactionFate, U256};
use std::cmp::Ordering;

/// A transaction reference with price for ordering in the priority index.
///
/// Ordered so that iteration runs from highest to lowest priority: higher
/// gas price first, then earlier arrival. The last element is the next
/// eviction victim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PricedTransaction {
    /// Gas price (higher = higher priority).
    pub gas_price: U256,
    /// Arrival sequence (lower = higher priority for ties).
    pub sequence: u64,
    /// Transaction hash.
    pub hash: Hash,
}

impl PricedTransaction {
    /// Creates a new priced transaction reference.
    pub fn new(gas_price: U256, sequence: u64, hash: Hash) -> Self {
        Self {
            gas_price,
            sequence,
            hash,
        }
    }
}

impl From<&PendingTransaction> for PricedTransaction {
    fn from(tx: &PendingTransaction) -> Self {
        Self::new(tx.gas_price, tx.sequence, tx.hash)
    }
}

impl Ord for PricedTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher gas price = higher priority (so reverse comparison)
        other
            .gas_price
            .cmp(&self.gas_price)
            // Earlier arrival = higher priority for same price
            .then_with(|| self.sequence.cmp(&other.sequence))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for PricedTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A transaction that left the pool and why.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DroppedTransaction {
    pub hash: Hash,
    pub fate: TransactionFate,
}

impl DroppedTransaction {
    pub fn new(hash: Hash, fate: TransactionFate) -> Self {
        Self { hash, fate }
    }
}

/// Result of a successful admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedTransaction {
    /// Hash of the admitted transaction.
    pub hash: Hash,
    /// Entry displaced to make room, if any.
    pub dropped: Option<DroppedTransaction>,
}

/// Effect of one imported block on the pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockUpdate {
    /// Pending entries found in the block.
    pub included: Vec<Hash>,
    /// Pending entries whose nonce the block made stale.
    pub invalidated: Vec<Hash>,
}

impl BlockUpdate {
    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.invalidated.is_empty()
    }

    /// Every removal as a dropped record.
    pub fn dropped(&self) -> impl Iterator<Item = DroppedTransaction> + '_ {
        self.included
            .iter()
            .map(|h| DroppedTransaction::new(*h, TransactionFate::Included))
            .chain(
                self.invalidated
                    .iter()
                    .map(|h| DroppedTransaction::new(*h, TransactionFate::Invalidated)),
            )
    }
}

/// Pool status snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of pending transactions.
    pub pending_count: usize,
    /// Pending transactions submitted locally.
    pub local_count: usize,
    /// Sum of gas limits in the pool.
    pub total_gas: u64,
    /// Age of oldest transaction in milliseconds.
    pub oldest_tx_age_ms: u64,
    /// Configured capacity.
    pub capacity: usize,
}

/// A frozen, priority-ordered copy of the pool.
///
/// Iterating it never observes concurrent mutation and can be restarted
/// any number of times.
#[derive(Clone, Debug, Default)]
pub struct PrioritySnapshot {
    entries: Vec<PendingTransaction>,
    taken_at: Timestamp,
}

impl PrioritySnapshot {
    pub(crate) fn new(entries: Vec<PendingTransaction>, taken_at: Timestamp) -> Self {
        Self { entries, taken_at }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PendingTransaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn taken_at(&self) -> Timestamp {
        self.taken_at
    }

    pub fn hashes(&self) -> Vec<Hash> {
        self.entries.iter().map(|tx| tx.hash).collect()
    }
}

impl<'a> IntoIterator for &'a PrioritySnapshot {
    type Item = &'a PendingTransaction;
    type IntoIter = std::slice::Iter<'a, PendingTransaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
