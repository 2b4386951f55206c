//! Adapters for transaction propagation.

pub mod pool_gateway;

pub use pool_gateway::PoolGateway;
