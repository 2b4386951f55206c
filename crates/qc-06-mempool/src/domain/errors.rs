//! Pool error types.
//!
//! Every rejection is a value. Nothing here is fatal to the node.

use super::entities::{Hash, U256};
use thiserror::Error;

fn short(hash: &Hash) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// Why the validator refused a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidReason {
    /// Nonce already used on chain.
    #[error("nonce too low: account nonce {expected}, got {actual}")]
    NonceTooLow { expected: u64, actual: u64 },

    /// Gas price is below the node minimum.
    #[error("gas price {price} below minimum {minimum}")]
    GasPriceTooLow { price: U256, minimum: U256 },

    /// Gas limit exceeds the per-transaction maximum.
    #[error("gas limit {limit} exceeds maximum {maximum}")]
    GasLimitTooHigh { limit: u64, maximum: u64 },

    /// Sender cannot cover value plus maximum gas cost.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    /// Signature does not verify.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Pool error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Hash is pending or was recently included.
    #[error("Transaction already known: {}", short(.0))]
    AlreadyKnown(Hash),

    /// Rejected by the transaction validator.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(InvalidReason),

    /// Pool at capacity and the transaction would be the first evicted.
    #[error("Pool full at {capacity} transactions")]
    PoolFull { capacity: usize },

    /// Same sender and nonce already pending at a price the new one does not beat.
    #[error("Replacement underpriced: {old_price} -> {new_price} (min {min_bump_percent}%)")]
    ReplacementUnderpriced {
        old_price: U256,
        new_price: U256,
        min_bump_percent: u64,
    },

    /// Transaction not found in the pool.
    #[error("Transaction not found: {}", short(.0))]
    TransactionNotFound(Hash),
}

impl From<InvalidReason> for MempoolError {
    fn from(reason: InvalidReason) -> Self {
        Self::InvalidTransaction(reason)
    }
}
