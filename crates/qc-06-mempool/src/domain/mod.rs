//! # Domain Layer - Transaction Pool
//!
//! Pure business logic, no locking and no I/O.
//!
//! ## Components
//!
//! - `entities`: PendingTransaction, TransactionOrigin, TransactionPoolConfig
//! - `pool`: TransactionPool with priority index and block pruning
//! - `services`: Replacement price rule, block nonce extraction
//! - `value_objects`: PricedTransaction, PoolStatus, PrioritySnapshot
//! - `errors`: MempoolError, InvalidReason

pub mod entities;
pub mod errors;
pub mod pool;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use pool::*;
pub use services::*;
pub use value_objects::*;
