//! Outbound (Driven) ports for the transaction pool.
//!
//! These traits define what the pool needs from the rest of the node.

use crate::domain::{Address, InvalidReason, SignedTransaction, Timestamp, U256};

/// Read-only view of committed account state.
pub trait AccountStateView: Send + Sync {
    /// Next nonce the chain expects from `address`.
    fn account_nonce(&self, address: &Address) -> u64;

    /// Spendable balance of `address`.
    fn account_balance(&self, address: &Address) -> U256;

    /// Number of the current chain head.
    fn chain_head_number(&self) -> u64;
}

/// Decides whether a transaction may enter the pool.
///
/// Called outside the pool lock. Cryptographic and consensus checks live
/// behind this trait.
pub trait TransactionValidator: Send + Sync {
    /// # Errors
    /// The reason the transaction must be refused.
    fn validate(
        &self,
        tx: &SignedTransaction,
        state: &dyn AccountStateView,
    ) -> Result<(), InvalidReason>;
}

/// Admission checks against committed state and node limits.
///
/// Signatures are only checked for shape; an all-zero (r, s) is refused.
/// Recovery belongs to a validator backed by the crypto subsystem.
#[derive(Debug, Clone)]
pub struct BasicTransactionValidator {
    /// Minimum accepted gas price.
    pub min_gas_price: U256,
    /// Maximum gas per transaction.
    pub max_gas_per_tx: u64,
}

impl Default for BasicTransactionValidator {
    fn default() -> Self {
        Self {
            min_gas_price: U256::from(1_000_000_000u64), // 1 gwei
            max_gas_per_tx: 30_000_000,
        }
    }
}

impl TransactionValidator for BasicTransactionValidator {
    fn validate(
        &self,
        tx: &SignedTransaction,
        state: &dyn AccountStateView,
    ) -> Result<(), InvalidReason> {
        if tx.signature.iter().all(|b| *b == 0) {
            return Err(InvalidReason::InvalidSignature);
        }

        let sender = tx.sender();
        let expected = state.account_nonce(&sender);
        if tx.nonce < expected {
            return Err(InvalidReason::NonceTooLow {
                expected,
                actual: tx.nonce,
            });
        }

        if tx.gas_price < self.min_gas_price {
            return Err(InvalidReason::GasPriceTooLow {
                price: tx.gas_price,
                minimum: self.min_gas_price,
            });
        }

        if tx.gas_limit > self.max_gas_per_tx {
            return Err(InvalidReason::GasLimitTooHigh {
                limit: tx.gas_limit,
                maximum: self.max_gas_per_tx,
            });
        }

        let required = tx.total_cost();
        let available = state.account_balance(&sender);
        if required > available {
            return Err(InvalidReason::InsufficientBalance {
                required,
                available,
            });
        }

        Ok(())
    }
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Mock account state for testing.
#[cfg(test)]
pub struct MockStateView {
    nonces: parking_lot::RwLock<std::collections::HashMap<Address, u64>>,
    /// Accounts without an entry are treated as unlimited.
    balances: parking_lot::RwLock<std::collections::HashMap<Address, U256>>,
    head: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockStateView {
    pub fn new() -> Self {
        Self {
            nonces: parking_lot::RwLock::new(std::collections::HashMap::new()),
            balances: parking_lot::RwLock::new(std::collections::HashMap::new()),
            head: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn with_nonce(self, address: Address, nonce: u64) -> Self {
        self.set_nonce(address, nonce);
        self
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.write().insert(address, nonce);
    }

    pub fn with_balance(self, address: Address, balance: U256) -> Self {
        self.set_balance(address, balance);
        self
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.write().insert(address, balance);
    }
}

#[cfg(test)]
impl AccountStateView for MockStateView {
    fn account_nonce(&self, address: &Address) -> u64 {
        self.nonces.read().get(address).copied().unwrap_or(0)
    }

    fn account_balance(&self, address: &Address) -> U256 {
        self.balances
            .read()
            .get(address)
            .copied()
            .unwrap_or(U256::MAX)
    }

    fn chain_head_number(&self) -> u64 {
        self.head.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}
