//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `U256`
//! - **Chain**: `BlockHeader`, `BlockBody`, `Block`, `TransactionReceipt`, `ChainHead`
//! - **Transactions**: `SignedTransaction`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte signature.
pub type Signature = [u8; 64];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Root of an empty list (SHA-256 of zero bytes).
pub const EMPTY_ROOT: Hash = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

/// Commitment over an ordered list of hashes.
///
/// Empty input yields [`EMPTY_ROOT`].
pub fn ordered_root<I>(hashes: I) -> Hash
where
    I: IntoIterator<Item = Hash>,
{
    let mut hasher = Sha256::new();
    for (index, hash) in hashes.into_iter().enumerate() {
        hasher.update((index as u64).to_be_bytes());
        hasher.update(hash);
    }
    hasher.finalize().into()
}

fn u256_bytes(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// The header of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Block number (height) in the chain.
    pub number: u64,
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Commitment over the ommer headers.
    pub ommers_hash: Hash,
    /// Root of the world state after applying this block.
    pub state_root: Hash,
    /// Commitment over the body's transactions.
    pub transactions_root: Hash,
    /// Commitment over the execution receipts.
    pub receipts_root: Hash,
    /// Difficulty contributed by this block.
    pub difficulty: U256,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    /// Free-form producer data.
    pub extra_data: Vec<u8>,
}

impl BlockHeader {
    /// Compute the header hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.parent_hash);
        hasher.update(self.ommers_hash);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.receipts_root);
        hasher.update(u256_bytes(&self.difficulty));
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(&self.extra_data);
        hasher.finalize().into()
    }

    /// Whether `self` directly extends `parent`.
    pub fn is_child_of(&self, parent: &BlockHeader) -> bool {
        self.number == parent.number + 1 && self.parent_hash == parent.hash()
    }
}

/// Transactions and ommers of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockBody {
    pub transactions: Vec<SignedTransaction>,
    pub ommers: Vec<BlockHeader>,
}

impl BlockBody {
    pub fn transactions_root(&self) -> Hash {
        ordered_root(self.transactions.iter().map(SignedTransaction::hash))
    }

    pub fn ommers_hash(&self) -> Hash {
        ordered_root(self.ommers.iter().map(BlockHeader::hash))
    }

    /// A body matches a header when both commitments agree.
    pub fn matches(&self, header: &BlockHeader) -> bool {
        self.transactions_root() == header.transactions_root
            && self.ommers_hash() == header.ommers_hash
    }
}

/// A full block: header plus body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}

/// Outcome of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Hash of the executed transaction.
    pub transaction_hash: Hash,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Whether execution succeeded.
    pub success: bool,
}

impl TransactionReceipt {
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.transaction_hash);
        hasher.update(self.cumulative_gas_used.to_be_bytes());
        hasher.update([u8::from(self.success)]);
        hasher.finalize().into()
    }
}

/// Commitment over a block's receipts.
pub fn receipts_root(receipts: &[TransactionReceipt]) -> Hash {
    ordered_root(receipts.iter().map(TransactionReceipt::hash))
}

/// The local chain's current head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainHead {
    pub header: BlockHeader,
    /// Accumulated difficulty up to and including `header`.
    pub total_difficulty: U256,
}

impl ChainHead {
    pub fn new(header: BlockHeader, total_difficulty: U256) -> Self {
        Self {
            header,
            total_difficulty,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// A signed transaction with all fields needed by the pool and execution.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sender address.
    pub from: Address,
    /// Recipient address (`None` for contract creation).
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Sender's account nonce.
    pub nonce: u64,
    /// Price per unit of gas.
    pub gas_price: U256,
    /// Gas limit for this transaction.
    pub gas_limit: u64,
    /// Call data.
    pub data: Vec<u8>,
    /// Signature (r, s).
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignedTransaction {
    /// Compute the transaction hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.from);
        if let Some(to) = &self.to {
            hasher.update(to);
        }
        hasher.update(u256_bytes(&self.value));
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(u256_bytes(&self.gas_price));
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.update(&self.data);
        hasher.update(self.signature);
        hasher.finalize().into()
    }

    /// Returns the sender address.
    pub fn sender(&self) -> Address {
        self.from
    }

    /// Returns the total cost (value + gas_price * gas_limit), saturating.
    pub fn total_cost(&self) -> U256 {
        self.value
            .saturating_add(self.gas_price.saturating_mul(U256::from(self.gas_limit)))
    }
}

/// Terminal state of a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionFate {
    /// Included in an imported block.
    Included,
    /// Pushed out by a higher-priority transaction.
    Evicted,
    /// Nonce became stale after a block import.
    Invalidated,
    /// Superseded by a same-nonce transaction with a higher price.
    Replaced,
    /// Outlived the retention period.
    Expired,
}
