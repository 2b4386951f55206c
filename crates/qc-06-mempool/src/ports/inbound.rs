//! # Inbound Port - TransactionPoolApi
//!
//! Primary driving port exposing the transaction pool.
//!
//! | Method | Typical caller |
//! |--------|----------------|
//! | `add_transaction` | Peer message handler, local RPC |
//! | `on_block_added` | Block-added bus subscriber |
//! | `select_for_block` | Block producer |
//! | `priority_snapshot` | Propagation, RPC |

use crate::domain::{
    BlockUpdate, DroppedTransaction, Hash, MempoolError, PendingTransaction, PoolStatus,
    PrioritySnapshot, SignedTransaction, TransactionOrigin,
};
use shared_types::Block;

/// Primary API of the transaction pool.
///
/// Every method is atomic with respect to every other.
pub trait TransactionPoolApi: Send + Sync {
    /// Validates and admits a transaction.
    ///
    /// # Errors
    /// - `AlreadyKnown`: pending or recently included
    /// - `InvalidTransaction`: refused by the validator
    /// - `ReplacementUnderpriced`: same (sender, nonce) without enough price bump
    /// - `PoolFull`: would be the first evicted
    fn add_transaction(
        &self,
        tx: SignedTransaction,
        origin: TransactionOrigin,
    ) -> Result<Hash, MempoolError>;

    /// Gets a pending transaction by hash.
    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<PendingTransaction>;

    /// Number of pending transactions.
    fn size(&self) -> usize;

    /// Priority-ordered copy of the pool.
    fn priority_snapshot(&self) -> PrioritySnapshot;

    /// Prunes included and stale transactions after a block import.
    fn on_block_added(&self, block: &Block) -> BlockUpdate;

    /// Highest priority transactions respecting per-sender nonce order.
    fn select_for_block(&self, max_count: usize, max_gas: u64) -> Vec<PendingTransaction>;

    /// Drops transactions older than the retention period.
    fn evict_expired(&self) -> Vec<DroppedTransaction>;

    /// Gets the current pool status.
    fn status(&self) -> PoolStatus;
}
