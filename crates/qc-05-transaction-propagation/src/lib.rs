//! # Transaction Propagation
//!
//! Tracks which transaction hashes each peer already knows and announces
//! newly pending transactions to the peers that do not.
//!
//! The tracker is advisory: it only decides what to send, so a lost entry
//! costs a duplicate announcement and nothing else. All state for a peer is
//! discarded when it disconnects.
//!
//! ## Module Structure
//!
//! ```text
//! domain/   - PeerTransactionTracker, PropagationConfig
//! ports/    - TransactionPropagationApi (in), TransactionNetwork and
//!             MempoolGateway (out)
//! adapters/ - PoolGateway onto the transaction pool
//! service   - TransactionPropagationService
//! events/   - PropagationError
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::PoolGateway;
pub use domain::*;
pub use events::PropagationError;
pub use ports::*;
pub use service::TransactionPropagationService;
