//! Event publisher adapter for the transaction pool.
//!
//! Announces admissions and removals on the shared bus.

use crate::domain::{DroppedTransaction, Hash};
use shared_bus::{BlockchainEvent, InMemoryEventBus};
use std::sync::Arc;
use tracing::trace;

/// Event publisher trait for the pool.
///
/// Called after the pool lock is released.
pub trait PoolEventPublisher: Send + Sync {
    /// Transactions entered the pool.
    fn publish_added(&self, hashes: &[Hash]);

    /// A transaction left the pool.
    fn publish_dropped(&self, dropped: DroppedTransaction);
}

/// No-op publisher for running without an event bus.
#[derive(Debug, Clone, Default)]
pub struct NoOpPublisher;

impl PoolEventPublisher for NoOpPublisher {
    fn publish_added(&self, _hashes: &[Hash]) {}

    fn publish_dropped(&self, _dropped: DroppedTransaction) {}
}

/// Publisher backed by the in-memory bus.
#[derive(Clone)]
pub struct BusPublisher {
    bus: Arc<InMemoryEventBus>,
}

impl BusPublisher {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

impl PoolEventPublisher for BusPublisher {
    fn publish_added(&self, hashes: &[Hash]) {
        if hashes.is_empty() {
            return;
        }
        let receivers = self
            .bus
            .emit(BlockchainEvent::TransactionsAdded(hashes.to_vec()));
        trace!(count = hashes.len(), receivers, "Announced pending transactions");
    }

    fn publish_dropped(&self, dropped: DroppedTransaction) {
        self.bus.emit(BlockchainEvent::TransactionDropped {
            hash: dropped.hash,
            fate: dropped.fate,
        });
    }
}

/// Recording publisher for testing.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingPublisher {
    pub added: parking_lot::Mutex<Vec<Hash>>,
    pub dropped: parking_lot::Mutex<Vec<DroppedTransaction>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl PoolEventPublisher for RecordingPublisher {
    fn publish_added(&self, hashes: &[Hash]) {
        self.added.lock().extend_from_slice(hashes);
    }

    fn publish_dropped(&self, dropped: DroppedTransaction) {
        self.dropped.lock().push(dropped);
    }
}
