//! Domain layer for transaction propagation.

pub mod tracker;
pub mod value_objects;

pub use tracker::PeerTransactionTracker;
pub use value_objects::*;
