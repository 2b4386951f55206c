//! Ports layer for the transaction pool.
//!
//! - Inbound (Driving) ports: API exposed to the rest of the node
//! - Outbound (Driven) ports: account state, validation, time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
