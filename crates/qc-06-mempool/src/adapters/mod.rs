//! Adapters layer for the transaction pool.
//!
//! Shared bus integration: outgoing pool events and incoming block imports.

pub mod publisher;
pub mod subscriber;

pub use publisher::{BusPublisher, NoOpPublisher, PoolEventPublisher};
pub use subscriber::BlockAddedSubscriber;
