//! # Domain Entities
//!
//! Sync target and the validation modes handed to the block importer.

use serde::{Deserialize, Serialize};
use shared_types::{BlockHeader, PeerId};

/// How blocks are applied locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// Execute every block on top of an available world state.
    Full,
    /// Import blocks with their receipts up to a pivot, without execution.
    Fast,
}

/// How thoroughly the importer checks headers (and ommers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderValidationMode {
    /// Every consensus rule, including the expensive ones.
    Full,
    /// Cheap rules only; the expensive ones are sampled.
    Light,
    /// Already checked elsewhere (e.g. a checkpoint header).
    Skip,
    /// No validation at all.
    None,
}

/// Header and ommer validation modes used together for one import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationModes {
    pub header: HeaderValidationMode,
    pub ommer: HeaderValidationMode,
}

impl ValidationModes {
    pub const FULL: Self = Self {
        header: HeaderValidationMode::Full,
        ommer: HeaderValidationMode::Full,
    };

    pub const LIGHT: Self = Self {
        header: HeaderValidationMode::Light,
        ommer: HeaderValidationMode::Light,
    };
}

/// The peer we are syncing from and where our chains meet.
///
/// Holds a peer handle only. The peer directory owns the peer, and the
/// target is discarded when the peer disconnects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTarget {
    peer: PeerId,
    common_ancestor: BlockHeader,
    pivot: Option<u64>,
}

impl SyncTarget {
    pub fn new(peer: PeerId, common_ancestor: BlockHeader) -> Self {
        Self {
            peer,
            common_ancestor,
            pivot: None,
        }
    }

    /// Target with a fast sync pivot block number.
    pub fn with_pivot(mut self, pivot: u64) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn common_ancestor(&self) -> &BlockHeader {
        &self.common_ancestor
    }

    pub fn pivot(&self) -> Option<u64> {
        self.pivot
    }

    /// Highest block this target syncs to, given the peer's height.
    pub fn sync_height(&self, peer_height: u64) -> u64 {
        self.pivot.map_or(peer_height, |pivot| pivot.min(peer_height))
    }
}
