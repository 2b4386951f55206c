//! # Shared Types Crate
//!
//! Chain entities and peer-facing value types shared by the sync, pool and
//! propagation crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type that crosses a crate boundary is
//!   defined here.
//! - **Opaque Payloads**: Blocks and transactions are keyed by number and hash.
//!   Consensus-level validation lives behind importer/validator ports.
//! - **Handles, not owners**: `PeerId` is a copyable handle. Peer lifetime is
//!   owned by the peer directory.

pub mod entities;
pub mod errors;
pub mod peers;

pub use entities::*;
pub use errors::*;
pub use peers::*;
