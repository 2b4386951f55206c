//! Domain services for the transaction pool.
//!
//! Pure functions over domain entities.

use super::entities::{Address, PendingTransaction, U256};
use shared_types::Block;
use std::collections::HashMap;

/// Calculates the minimum gas price required to replace a pending transaction.
///
/// Formula: old_price * (100 + bump_percent) / 100
pub fn calculate_replacement_min_price(old_price: U256, bump_percent: u64) -> U256 {
    old_price * U256::from(100 + bump_percent) / U256::from(100)
}

/// Checks if a new gas price is sufficient to replace the old one.
pub fn is_sufficient_price_bump(old_price: U256, new_price: U256, bump_percent: u64) -> bool {
    new_price >= calculate_replacement_min_price(old_price, bump_percent)
}

/// Next usable nonce per sender implied by a block's own transactions.
pub fn next_nonces_in_block(block: &Block) -> HashMap<Address, u64> {
    let mut next = HashMap::new();
    for tx in &block.body.transactions {
        let entry = next.entry(tx.sender()).or_insert(0u64);
        *entry = (*entry).max(tx.nonce.saturating_add(1));
    }
    next
}

/// Computes the total gas for a list of transactions.
pub fn total_gas<'a, I>(transactions: I) -> u64
where
    I: IntoIterator<Item = &'a PendingTransaction>,
{
    transactions
        .into_iter()
        .fold(0u64, |acc, tx| acc.saturating_add(tx.gas_limit))
}
