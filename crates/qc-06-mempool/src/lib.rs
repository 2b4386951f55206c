//! # Pending Transaction Pool
//!
//! Holds transactions that are valid but not yet in a block, keeps them
//! valid as the chain advances, and orders them for block building and
//! eviction.
//!
//! ## Lifecycle
//!
//! ```text
//!            add_transaction
//! [absent] ─────────────────→ [pending] ──block import──→ [included]
//!                                │  │
//!                                │  └─ nonce made stale ──→ [invalidated]
//!                                ├──── lowest priority ───→ [evicted]
//!                                ├──── price bump ────────→ [replaced]
//!                                └──── retention ─────────→ [expired]
//! ```
//!
//! ## Ordering
//!
//! | Use | Order |
//! |-----|-------|
//! | Priority iteration | gas price descending, then arrival ascending |
//! | Eviction | the last entry of priority order: cheapest, newest among equals |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - Bus publisher, block-added subscriber              │
//! │  service.rs - TransactionPoolService (RwLock + ports)           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - TransactionPoolApi trait                   │
//! │  ports/outbound.rs - AccountStateView, TransactionValidator,    │
//! │                      TimeSource                                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/pool.rs        - TransactionPool with priority index    │
//! │  domain/entities.rs    - PendingTransaction, config             │
//! │  domain/services.rs    - Replacement rule, block nonces         │
//! │  domain/value_objects.rs - PricedTransaction, PoolStatus        │
//! │  domain/errors.rs      - MempoolError, InvalidReason            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::TransactionPoolService;
