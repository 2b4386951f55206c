//! # Sync Target Manager
//!
//! Picks the peer to sync from, finds where our chains meet and decides
//! when to move to a better peer.
//!
//! Mode-specific rules live behind [`SyncTargetStrategy`]:
//!
//! | Rule | Full | Fast |
//! |------|------|------|
//! | Candidate | peer ahead of us | peer ahead of us and of its pivot |
//! | Ancestor world state | required | not required |
//! | Keep downloading | always | until one span below the pivot |
//! | Validation | `Full` / `Full` | `Light` / `Light` |

use crate::algorithms::AncestorSearch;
use crate::application::{with_timeout, SyncPorts};
use crate::config::SyncConfig;
use crate::domain::{HeaderRequest, SyncError, SyncMode, SyncTarget, ValidationModes};
use shared_types::{BlockHeader, ChainHead, DisconnectReason, PeerChainState, PeerId, StorageError, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mode-specific target rules.
pub trait SyncTargetStrategy: Send + Sync {
    fn mode(&self) -> SyncMode;

    /// Modes handed to the importer for every block.
    fn validation_modes(&self) -> ValidationModes;

    /// Whether `peer` has anything worth syncing.
    fn is_candidate(&self, peer: &PeerChainState, local: &ChainHead) -> bool;

    /// Whether the common ancestor's world state must exist locally.
    fn requires_world_state(&self) -> bool;

    /// Pivot block for a peer at `peer_height`, if the mode uses one.
    fn pivot(&self, peer_height: u64) -> Option<u64>;

    fn should_continue_downloading(&self, local: &ChainHead, target: &SyncTarget) -> bool;
}

/// Execute every block from the common ancestor up.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullSyncTargetStrategy;

impl SyncTargetStrategy for FullSyncTargetStrategy {
    fn mode(&self) -> SyncMode {
        SyncMode::Full
    }

    fn validation_modes(&self) -> ValidationModes {
        ValidationModes::FULL
    }

    fn is_candidate(&self, peer: &PeerChainState, local: &ChainHead) -> bool {
        peer.is_ahead_of(local)
    }

    fn requires_world_state(&self) -> bool {
        true
    }

    fn pivot(&self, _peer_height: u64) -> Option<u64> {
        None
    }

    fn should_continue_downloading(&self, _local: &ChainHead, _target: &SyncTarget) -> bool {
        true
    }
}

/// Import blocks with receipts up to a pivot below the peer's head.
#[derive(Clone, Copy, Debug)]
pub struct FastSyncTargetStrategy {
    pivot_distance: u64,
    checkpoint_span: u64,
}

impl FastSyncTargetStrategy {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            pivot_distance: config.fast_sync_pivot_distance,
            checkpoint_span: config.checkpoint_span,
        }
    }
}

impl SyncTargetStrategy for FastSyncTargetStrategy {
    fn mode(&self) -> SyncMode {
        SyncMode::Fast
    }

    fn validation_modes(&self) -> ValidationModes {
        ValidationModes::LIGHT
    }

    fn is_candidate(&self, peer: &PeerChainState, local: &ChainHead) -> bool {
        peer.is_ahead_of(local)
            && self
                .pivot(peer.estimated_height())
                .is_some_and(|pivot| pivot > local.number())
    }

    fn requires_world_state(&self) -> bool {
        false
    }

    fn pivot(&self, peer_height: u64) -> Option<u64> {
        peer_height.checked_sub(self.pivot_distance)
    }

    fn should_continue_downloading(&self, local: &ChainHead, target: &SyncTarget) -> bool {
        target
            .pivot()
            .is_some_and(|pivot| local.number().saturating_add(self.checkpoint_span) < pivot)
    }
}

/// Selects and finalizes sync targets.
pub struct SyncTargetManager {
    config: SyncConfig,
    strategy: Arc<dyn SyncTargetStrategy>,
    ports: SyncPorts,
}

impl SyncTargetManager {
    pub fn new(config: SyncConfig, strategy: Arc<dyn SyncTargetStrategy>, ports: SyncPorts) -> Self {
        Self {
            config,
            strategy,
            ports,
        }
    }

    pub fn strategy(&self) -> &dyn SyncTargetStrategy {
        self.strategy.as_ref()
    }

    /// Best connected peer, if it has anything we lack.
    ///
    /// `None` when there are no peers or when we have caught up with the
    /// best one. Neither case disconnects anybody.
    pub fn select_best_available_sync_target(&self) -> Option<PeerId> {
        let (peer, state) = self.ports.peers.best_peer()?;
        let local = self.ports.chain.chain_head();

        if !self.strategy.is_candidate(&state, &local) {
            debug!(
                peer = %peer,
                peer_height = state.estimated_height(),
                local_height = local.number(),
                "Best peer is not ahead, nothing to sync"
            );
            return None;
        }
        Some(peer)
    }

    /// Turn a candidate into a target.
    ///
    /// Finds the common ancestor and, when the mode needs it, checks its
    /// world state. A peer whose ancestor state we lack is disconnected as
    /// useless.
    pub async fn finalize_selected_sync_target(
        &self,
        peer: PeerId,
    ) -> Result<Option<SyncTarget>, SyncError> {
        let Some(state) = self.ports.peers.chain_state(&peer) else {
            debug!(peer = %peer, "Candidate left before finalization");
            return Ok(None);
        };

        let ancestor = self
            .find_common_ancestor(peer, state.estimated_height())
            .await?;

        if self.strategy.requires_world_state()
            && !self
                .ports
                .world_state
                .is_world_state_available(&ancestor.state_root)
        {
            warn!(
                peer = %peer,
                ancestor = ancestor.number,
                "World state for common ancestor unavailable"
            );
            self.ports
                .peers
                .disconnect(&peer, DisconnectReason::UselessPeer);
            return Ok(None);
        }

        let mut target = SyncTarget::new(peer, ancestor);
        if let Some(pivot) = self.strategy.pivot(state.estimated_height()) {
            target = target.with_pivot(pivot);
        }
        info!(
            peer = %peer,
            ancestor = target.common_ancestor().number,
            peer_height = state.estimated_height(),
            "Sync target selected"
        );
        Ok(Some(target))
    }

    /// Keep `current` while it is usable, otherwise select a new target.
    pub async fn find_sync_target(
        &self,
        current: Option<&SyncTarget>,
    ) -> Result<Option<SyncTarget>, SyncError> {
        if let Some(current) = current {
            if self.is_viable(current) {
                return Ok(Some(current.clone()));
            }
        }
        match self.select_best_available_sync_target() {
            Some(peer) => self.finalize_selected_sync_target(peer).await,
            None => Ok(None),
        }
    }

    pub fn should_continue_downloading(&self, target: &SyncTarget) -> bool {
        let local = self.ports.chain.chain_head();
        self.strategy.should_continue_downloading(&local, target)
    }

    /// Whether `current` should be dropped for a better peer.
    ///
    /// True when the target is gone, or when the best peer leads it by more
    /// than the configured total difficulty (or, at equal total difficulty,
    /// height) differential.
    pub fn should_switch_sync_target(&self, current: &SyncTarget) -> bool {
        let Some(current_state) = self.ports.peers.chain_state(&current.peer()) else {
            return true;
        };
        let Some((best, best_state)) = self.ports.peers.best_peer() else {
            return false;
        };
        if best == current.peer() {
            return false;
        }

        let best_td = best_state.total_difficulty();
        let current_td = current_state.total_difficulty();
        if best_td > current_td {
            best_td - current_td > U256::from(self.config.min_td_switch_differential)
        } else if best_td == current_td {
            best_state.estimated_height()
                > current_state
                    .estimated_height()
                    .saturating_add(self.config.min_height_switch_differential)
        } else {
            false
        }
    }

    fn is_viable(&self, target: &SyncTarget) -> bool {
        let local = self.ports.chain.chain_head();
        self.ports
            .peers
            .chain_state(&target.peer())
            .is_some_and(|state| self.strategy.is_candidate(&state, &local))
    }

    /// Highest block shared with `peer`.
    pub async fn find_common_ancestor(
        &self,
        peer: PeerId,
        peer_height: u64,
    ) -> Result<BlockHeader, SyncError> {
        let local_head = self.ports.chain.chain_head();
        let mut search = AncestorSearch::new(local_head.number().min(peer_height));

        while let Some(number) = search.next_probe() {
            let remote = self.fetch_header(peer, number).await?;
            let local = self.local_header(number)?;
            search.record(number, remote.hash() == local.hash());
        }

        let ancestor = self.local_header(search.ancestor())?;
        debug!(peer = %peer, ancestor = ancestor.number, "Found common ancestor");
        Ok(ancestor)
    }

    async fn fetch_header(&self, peer: PeerId, number: u64) -> Result<BlockHeader, SyncError> {
        let headers = with_timeout(
            peer,
            self.config.request_timeout(),
            self.ports
                .source
                .download_headers(peer, HeaderRequest::single(number)),
        )
        .await?;

        match headers.into_iter().next() {
            Some(header) if header.number == number => Ok(header),
            Some(header) => Err(SyncError::InvalidHeaders {
                peer,
                reason: format!("asked for block {number}, got {}", header.number),
            }),
            None => Err(SyncError::EmptyResponse { peer }),
        }
    }

    fn local_header(&self, number: u64) -> Result<BlockHeader, SyncError> {
        self.ports
            .chain
            .header_by_number(number)?
            .ok_or_else(|| StorageError::NotFound(format!("header {number}")).into())
    }
}
