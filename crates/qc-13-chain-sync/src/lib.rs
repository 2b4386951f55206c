//! # QC-13 Chain Sync
//!
//! Brings the local chain up to the best connected peer.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Sync Round
//!
//! ```text
//! select best peer ──→ find common ancestor ──→ check ancestor state
//!        ↑                                              │
//!        │                                              ↓
//!   next round ←── import ranges in order ←── checkpoint ranges
//! ```
//!
//! Ranges are downloaded concurrently (bounded by `max_inflight_ranges`)
//! and imported strictly in order. A disconnect of the target, or a better
//! peer appearing, cancels the round between block imports.
//!
//! ## Modes
//!
//! | Mode | Target | Import |
//! |------|--------|--------|
//! | Full | peer head | execute every block, requires ancestor state |
//! | Fast | pivot below peer head | store blocks with receipts, no execution |
//!
//! ## Module Structure
//!
//! ```text
//! qc-13-chain-sync/
//! ├── domain/          # SyncTarget, CheckpointRange, SyncError, invariants
//! ├── algorithms/      # checkpoint partitioning, download validation, ancestor search
//! ├── ports/           # ChainSyncApi (inbound) + peer/wire/chain traits (outbound)
//! ├── application/     # target manager, range source, pipeline, service
//! ├── adapters/        # InMemoryPeerDirectory
//! └── config.rs        # SyncConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::InMemoryPeerDirectory;
pub use algorithms::{
    checkpoint_numbers, partition_into_ranges, validate_body, validate_range_headers,
    validate_receipts, AncestorSearch,
};
pub use application::{
    BlockPipeline, ChainSyncService, CheckpointRangeSource, FastSyncTargetStrategy,
    FullSyncTargetStrategy, SyncPorts, SyncTargetManager, SyncTargetStrategy,
};
pub use config::SyncConfig;
pub use domain::{
    CheckpointRange, HeaderRequest, HeaderValidationMode, PipelineReport, SyncError, SyncMode,
    SyncOutcome, SyncStatus, SyncTarget, ValidationModes,
};
pub use ports::{BlockImporter, BlockSource, ChainSyncApi, LocalChain, PeerDirectory, WorldStateQuery};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
