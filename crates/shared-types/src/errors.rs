//! # Error Types
//!
//! Errors shared across crates. Storage failures are the only class the
//! sync core treats as fatal.

use thiserror::Error;

/// Errors raised by the local chain storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Block not found in storage.
    #[error("Block not found: {0}")]
    NotFound(String),

    /// Data corruption detected during read.
    #[error("Data corruption at block {number}")]
    DataCorruption { number: u64 },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}
