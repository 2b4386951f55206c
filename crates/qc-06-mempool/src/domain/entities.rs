//! Core domain entities for the transaction pool.

use serde::{Deserialize, Serialize};

// Re-export from shared-types for convenience
pub use shared_types::{Address, Hash, SignedTransaction, TransactionFate, U256};

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Where a transaction entered the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionOrigin {
    /// Submitted through this node's own API.
    Local,
    /// Received from a peer.
    Remote,
}

/// A transaction waiting in the pool, with its admission metadata.
///
/// Built once on admission and never mutated afterwards. A price bump
/// produces a new entry with a fresh sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    /// The signed transaction.
    pub transaction: SignedTransaction,
    /// Transaction hash (unique key in the pool).
    pub hash: Hash,
    /// Sender address.
    pub sender: Address,
    /// Sender's nonce for this transaction.
    pub nonce: u64,
    /// Gas price used for prioritization.
    pub gas_price: U256,
    /// Gas limit for this transaction.
    pub gas_limit: u64,
    /// Monotonic arrival number. Larger means newer.
    pub sequence: u64,
    /// Timestamp when admitted (ms).
    pub added_at: Timestamp,
    /// Local or remote submission.
    pub origin: TransactionOrigin,
}

impl PendingTransaction {
    /// Wraps a signed transaction with admission metadata.
    pub fn new(
        transaction: SignedTransaction,
        sequence: u64,
        added_at: Timestamp,
        origin: TransactionOrigin,
    ) -> Self {
        let hash = transaction.hash();
        let sender = transaction.sender();
        let nonce = transaction.nonce;
        let gas_price = transaction.gas_price;
        let gas_limit = transaction.gas_limit;

        Self {
            transaction,
            hash,
            sender,
            nonce,
            gas_price,
            gas_limit,
            sequence,
            added_at,
            origin,
        }
    }

    /// Returns true for transactions submitted through the local API.
    pub fn is_local(&self) -> bool {
        self.origin == TransactionOrigin::Local
    }

    /// Returns the total gas cost (gas_price * gas_limit).
    pub fn gas_cost(&self) -> U256 {
        self.gas_price * U256::from(self.gas_limit)
    }

    /// Milliseconds since admission.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.added_at)
    }
}

/// Pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPoolConfig {
    /// Maximum number of pending transactions.
    pub max_pending_transactions: usize,
    /// Minimum price increase (percent) for a same-nonce replacement.
    pub price_bump_percent: u64,
    /// How many recently included hashes to remember.
    pub included_cache_size: usize,
    /// Maximum time a transaction may stay pending (ms).
    pub retention_period_ms: u64,
}

impl Default for TransactionPoolConfig {
    fn default() -> Self {
        Self {
            max_pending_transactions: 4096,
            price_bump_percent: 10,
            included_cache_size: 8192,
            retention_period_ms: 13 * 60 * 60 * 1000, // 13 hours
        }
    }
}

impl TransactionPoolConfig {
    /// Creates a minimal config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_pending_transactions: 10,
            included_cache_size: 64,
            retention_period_ms: 60_000,
            ..Default::default()
        }
    }
}
