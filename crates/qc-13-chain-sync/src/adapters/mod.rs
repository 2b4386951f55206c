//! # Adapters Layer
//!
//! In-process implementations of outbound ports.

mod peer_directory;

pub use peer_directory::InMemoryPeerDirectory;
