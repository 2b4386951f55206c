//! # Chain Sync Service
//!
//! Drives sync rounds: find a target, generate ranges, run the pipeline,
//! repeat. While a round runs, a monitor watches for the target's
//! disconnect and for better peers, and cancels the round when either
//! happens.
//!
//! ## Failure Handling
//!
//! | Error | Action |
//! |-------|--------|
//! | Peer fault | disconnect peer, drop target, next round |
//! | Cancelled, peer gone, network | drop target, next round |
//! | Storage, config | stop and return the error |

use crate::application::{
    BlockPipeline, CheckpointRangeSource, FastSyncTargetStrategy, FullSyncTargetStrategy,
    SyncPorts, SyncTargetManager, SyncTargetStrategy,
};
use crate::config::SyncConfig;
use crate::domain::{PipelineReport, SyncError, SyncOutcome, SyncStatus, SyncTarget};
use crate::ports::ChainSyncApi;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{BlockchainEvent, EventFilter, EventTopic, InMemoryEventBus, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct SyncState {
    target: Option<SyncTarget>,
    target_height: Option<u64>,
    blocks_imported: u64,
}

/// Chain sync driver.
pub struct ChainSyncService {
    config: SyncConfig,
    ports: SyncPorts,
    targets: SyncTargetManager,
    pipeline: BlockPipeline,
    bus: Arc<InMemoryEventBus>,
    state: RwLock<SyncState>,
}

impl ChainSyncService {
    pub fn new(
        config: SyncConfig,
        strategy: Arc<dyn SyncTargetStrategy>,
        ports: SyncPorts,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        let pipeline = BlockPipeline::new(
            config.clone(),
            strategy.mode(),
            strategy.validation_modes(),
            Arc::clone(&ports.source),
            Arc::clone(&ports.importer),
        );
        let targets = SyncTargetManager::new(config.clone(), strategy, ports.clone());

        Ok(Self {
            config,
            ports,
            targets,
            pipeline,
            bus,
            state: RwLock::new(SyncState::default()),
        })
    }

    /// Full sync service.
    pub fn full(
        config: SyncConfig,
        ports: SyncPorts,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, SyncError> {
        Self::new(config, Arc::new(FullSyncTargetStrategy), ports, bus)
    }

    /// Fast sync service.
    pub fn fast(
        config: SyncConfig,
        ports: SyncPorts,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, SyncError> {
        let strategy = Arc::new(FastSyncTargetStrategy::new(&config));
        Self::new(config, strategy, ports, bus)
    }

    pub fn target_manager(&self) -> &SyncTargetManager {
        &self.targets
    }

    async fn sync_round(&self, shutdown: &CancellationToken) -> Result<SyncOutcome, SyncError> {
        let current = self.current_target();
        let Some(target) = self.targets.find_sync_target(current.as_ref()).await? else {
            self.clear_target();
            return Ok(SyncOutcome::NoTarget);
        };

        let peer_height = self
            .ports
            .peers
            .chain_state(&target.peer())
            .map_or(target.common_ancestor().number, |state| state.estimated_height());
        let sync_height = target.sync_height(peer_height);
        self.set_target(&target, sync_height);

        // Subscribe before work starts so a disconnect cannot slip by
        let subscription = self
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Peers]));
        let round = shutdown.child_token();

        let work = async {
            let result = self.sync_to_target(&target, sync_height, &round).await;
            round.cancel();
            result
        };
        let (result, retargeted) =
            tokio::join!(work, self.monitor_target(&target, subscription, &round));

        match result {
            Ok(report) if retargeted => {
                self.clear_target();
                Ok(SyncOutcome::Retargeted(report))
            }
            Ok(report) => {
                info!(
                    peer = %target.peer(),
                    blocks = report.blocks_imported,
                    head = self.ports.chain.chain_head().number(),
                    "Sync target reached"
                );
                self.clear_target();
                Ok(SyncOutcome::Completed(report))
            }
            Err(SyncError::Cancelled) if retargeted && !shutdown.is_cancelled() => {
                self.clear_target();
                Ok(SyncOutcome::Retargeted(PipelineReport::default()))
            }
            Err(e) => Err(e),
        }
    }

    async fn sync_to_target(
        &self,
        target: &SyncTarget,
        sync_height: u64,
        round: &CancellationToken,
    ) -> Result<PipelineReport, SyncError> {
        let mut ranges = CheckpointRangeSource::new(
            &self.config,
            Arc::clone(&self.ports.source),
            target,
            sync_height,
        );
        let mut total = PipelineReport::default();

        loop {
            if round.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if !self.targets.should_continue_downloading(target) {
                debug!(peer = %target.peer(), "Strategy stopped downloading");
                break;
            }

            let batch = tokio::select! {
                _ = round.cancelled() => return Err(SyncError::Cancelled),
                batch = ranges.next_batch() => batch?,
            };
            if batch.is_empty() {
                break;
            }

            let report = self.pipeline.run(batch, round).await?;
            if let Some(last) = &report.last_imported {
                ranges.advance_to(last.clone());
            }
            self.state.write().blocks_imported += report.blocks_imported;
            total.merge(report);
        }
        Ok(total)
    }

    /// Resolves to true if the round had to be abandoned.
    async fn monitor_target(
        &self,
        target: &SyncTarget,
        subscription: Subscription,
        round: &CancellationToken,
    ) -> bool {
        let mut subscription = Some(subscription);
        let mut check = tokio::time::interval(self.config.target_check_interval());
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = round.cancelled() => return false,
                _ = check.tick() => {
                    if self.targets.should_switch_sync_target(target) {
                        info!(peer = %target.peer(), "Switching to a better sync target");
                        round.cancel();
                        return true;
                    }
                }
                event = next_event(&mut subscription) => match event {
                    Some(BlockchainEvent::PeerDisconnected(peer)) if peer == target.peer() => {
                        info!(peer = %peer, "Sync target disconnected");
                        round.cancel();
                        return true;
                    }
                    Some(_) => {}
                    None => subscription = None,
                },
            }
        }
    }

    fn set_target(&self, target: &SyncTarget, sync_height: u64) {
        {
            let mut state = self.state.write();
            state.target = Some(target.clone());
            state.target_height = Some(sync_height);
        }
        self.bus.emit(BlockchainEvent::SyncTargetSelected {
            peer: target.peer(),
            common_ancestor: target.common_ancestor().number,
        });
    }

    fn clear_target(&self) {
        let previous = {
            let mut state = self.state.write();
            state.target_height = None;
            state.target.take()
        };
        if let Some(target) = previous {
            self.bus
                .emit(BlockchainEvent::SyncTargetCleared { peer: target.peer() });
        }
    }

    fn handle_failure(&self, err: &SyncError) {
        match (err.peer(), err.disconnect_reason()) {
            (Some(peer), Some(reason)) => {
                warn!(peer = %peer, %reason, error = %err, "Disconnecting sync peer");
                self.ports.peers.disconnect(&peer, reason);
            }
            _ if err.is_fatal() => error!(error = %err, "Chain sync failed"),
            _ => debug!(error = %err, "Sync round abandoned"),
        }
        self.clear_target();
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<BlockchainEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_or_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[async_trait]
impl ChainSyncApi for ChainSyncService {
    /// Failures are handled before they are returned: the faulty peer is
    /// disconnected and the target dropped.
    async fn sync_once(&self, shutdown: &CancellationToken) -> Result<SyncOutcome, SyncError> {
        let result = self.sync_round(shutdown).await;
        if let Err(err) = &result {
            self.handle_failure(err);
        }
        result
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(mode = ?self.targets.strategy().mode(), "Chain sync started");

        while !shutdown.is_cancelled() {
            match self.sync_once(&shutdown).await {
                Ok(SyncOutcome::NoTarget) => {
                    if sleep_or_shutdown(self.config.retarget_poll_interval(), &shutdown).await {
                        break;
                    }
                }
                Ok(SyncOutcome::Completed(_)) | Ok(SyncOutcome::Retargeted(_)) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => {
                    if sleep_or_shutdown(self.config.retarget_poll_interval(), &shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Chain sync stopped");
        Ok(())
    }

    fn current_target(&self) -> Option<SyncTarget> {
        self.state.read().target.clone()
    }

    fn status(&self) -> SyncStatus {
        let state = self.state.read();
        SyncStatus {
            mode: self.targets.strategy().mode(),
            local_height: self.ports.chain.chain_head().number(),
            target_peer: state.target.as_ref().map(SyncTarget::peer),
            target_height: state.target_height,
            blocks_imported: state.blocks_imported,
        }
    }
}
