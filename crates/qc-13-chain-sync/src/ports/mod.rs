//! # Ports
//!
//! Inbound (API) and outbound (dependency) traits.

pub mod inbound;
pub mod outbound;

pub use inbound::ChainSyncApi;
pub use outbound::{BlockImporter, BlockSource, LocalChain, PeerDirectory, WorldStateQuery};
