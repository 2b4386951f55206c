//! # Test Utilities
//!
//! A simulated network for exercising sync without sockets: generated
//! chains, a local chain that imports blocks, and peers that serve
//! headers, bodies and receipts from their own copy of a chain.
//!
//! Peer misbehaviour (wrong numbers, withheld skeletons, corrupt bodies,
//! slow answers, short answers) is switched on per test.

use crate::adapters::InMemoryPeerDirectory;
use crate::application::SyncPorts;
use crate::domain::{HeaderRequest, SyncError, ValidationModes};
use crate::ports::{BlockImporter, BlockSource, LocalChain, WorldStateQuery};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_types::{
    receipts_root, Block, BlockBody, BlockHeader, ChainHead, Hash, PeerChainState, PeerId,
    SignedTransaction, StorageError, TransactionReceipt, U256,
};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

const TX_GAS: u64 = 21_000;

// =============================================================================
// CHAIN GENERATION
// =============================================================================

/// A linked chain of `len` blocks starting at genesis.
pub fn build_chain(len: u64) -> Vec<Block> {
    extend_chain(Vec::new(), len, 0)
}

/// A chain sharing `base[..=fork_at]` that diverges above `fork_at`, up to
/// `len` blocks in total. Different seeds give different forks.
pub fn fork_chain(base: &[Block], fork_at: u64, len: u64, seed: u8) -> Vec<Block> {
    let shared = base[..=fork_at as usize].to_vec();
    extend_chain(shared, len, seed.max(1))
}

/// Receipts the simulated executor produces for `block`.
pub fn receipts_for(block: &Block) -> Vec<TransactionReceipt> {
    block
        .body
        .transactions
        .iter()
        .zip(1u64..)
        .map(|(tx, index)| TransactionReceipt {
            transaction_hash: tx.hash(),
            cumulative_gas_used: TX_GAS * index,
            success: true,
        })
        .collect()
}

/// Sum of the blocks' difficulties.
pub fn total_difficulty(blocks: &[Block]) -> U256 {
    blocks
        .iter()
        .fold(U256::zero(), |td, block| td + block.header.difficulty)
}

fn extend_chain(mut blocks: Vec<Block>, len: u64, seed: u8) -> Vec<Block> {
    while (blocks.len() as u64) < len {
        let number = blocks.len() as u64;
        let parent = blocks.last().map(|block| &block.header);
        let block = make_block(parent, number, seed);
        blocks.push(block);
    }
    blocks
}

fn make_block(parent: Option<&BlockHeader>, number: u64, seed: u8) -> Block {
    let transactions: Vec<SignedTransaction> = (0..number % 3)
        .map(|nonce| transaction(number, nonce, seed))
        .collect();
    let body = BlockBody {
        transactions,
        ommers: Vec::new(),
    };

    let mut state_root = [seed; 32];
    state_root[..8].copy_from_slice(&number.to_be_bytes());

    let header = BlockHeader {
        number,
        parent_hash: parent.map_or([0; 32], BlockHeader::hash),
        ommers_hash: body.ommers_hash(),
        state_root,
        transactions_root: body.transactions_root(),
        receipts_root: [0; 32],
        difficulty: U256::from(1_000 + number),
        gas_limit: 8_000_000,
        gas_used: TX_GAS * body.transactions.len() as u64,
        timestamp: 1_600_000_000 + number * 12,
        extra_data: vec![seed],
    };
    let mut block = Block::new(header, body);
    block.header.receipts_root = receipts_root(&receipts_for(&block));
    block
}

fn transaction(number: u64, nonce: u64, seed: u8) -> SignedTransaction {
    let mut from = [seed; 20];
    from[..8].copy_from_slice(&number.to_be_bytes());
    SignedTransaction {
        from,
        to: Some([0xAA; 20]),
        value: U256::from(number + 1),
        nonce,
        gas_price: U256::from(1_000_000_000u64),
        gas_limit: TX_GAS,
        data: Vec::new(),
        signature: [seed; 64],
    }
}

// =============================================================================
// LOCAL CHAIN
// =============================================================================

struct ChainState {
    /// Canonical blocks, indexed by number.
    blocks: Vec<Block>,
    total_difficulty: U256,
    available_state: HashSet<Hash>,
    rejected: HashSet<u64>,
    imported: Vec<u64>,
    imported_full: Vec<u64>,
    fast_imported: usize,
}

/// Local chain, importer and world state in one.
///
/// Imports must extend the head. Full imports make the block's state
/// available; fast imports do not.
pub struct MockChain {
    state: RwLock<ChainState>,
}

impl MockChain {
    pub fn new(blocks: Vec<Block>) -> Self {
        let available_state = blocks.iter().map(|b| b.header.state_root).collect();
        Self {
            state: RwLock::new(ChainState {
                total_difficulty: total_difficulty(&blocks),
                blocks,
                available_state,
                rejected: HashSet::new(),
                imported: Vec::new(),
                imported_full: Vec::new(),
                fast_imported: 0,
            }),
        }
    }

    /// Pretend the world state under `state_root` was pruned.
    pub fn forget_state(&self, state_root: &Hash) {
        self.state.write().available_state.remove(state_root);
    }

    /// Make the importer refuse block `number`.
    pub fn reject_block(&self, number: u64) {
        self.state.write().rejected.insert(number);
    }

    /// Numbers of all imported blocks, in import order.
    pub fn imported(&self) -> Vec<u64> {
        self.state.read().imported.clone()
    }

    pub fn imported_full(&self) -> Vec<u64> {
        self.state.read().imported_full.clone()
    }

    pub fn fast_imported(&self) -> usize {
        self.state.read().fast_imported
    }

    pub fn head_number(&self) -> u64 {
        self.state.read().blocks.last().map_or(0, Block::number)
    }

    fn import(&self, block: &Block, fast: bool) -> bool {
        let mut state = self.state.write();
        if state.rejected.contains(&block.number()) || !block.body.matches(&block.header) {
            return false;
        }
        let extends_head = state
            .blocks
            .last()
            .is_some_and(|head| block.header.is_child_of(&head.header));
        if !extends_head {
            return false;
        }

        state.total_difficulty = state.total_difficulty + block.header.difficulty;
        state.imported.push(block.number());
        if fast {
            state.fast_imported += 1;
        } else {
            state.available_state.insert(block.header.state_root);
            state.imported_full.push(block.number());
        }
        state.blocks.push(block.clone());
        true
    }
}

impl LocalChain for MockChain {
    fn chain_head(&self) -> ChainHead {
        let state = self.state.read();
        let header = state
            .blocks
            .last()
            .map(|block| block.header.clone())
            .unwrap_or_default();
        ChainHead::new(header, state.total_difficulty)
    }

    fn header_by_number(&self, number: u64) -> Result<Option<BlockHeader>, StorageError> {
        Ok(self
            .state
            .read()
            .blocks
            .get(number as usize)
            .map(|block| block.header.clone()))
    }
}

#[async_trait]
impl BlockImporter for MockChain {
    async fn import_block(&self, block: &Block, _modes: ValidationModes) -> bool {
        self.import(block, false)
    }

    async fn fast_import_block(
        &self,
        block: &Block,
        receipts: &[TransactionReceipt],
        _modes: ValidationModes,
    ) -> bool {
        receipts_root(receipts) == block.header.receipts_root && self.import(block, true)
    }
}

impl WorldStateQuery for MockChain {
    fn is_world_state_available(&self, state_root: &Hash) -> bool {
        self.state.read().available_state.contains(state_root)
    }
}

// =============================================================================
// REMOTE PEERS
// =============================================================================

#[derive(Default)]
struct PeerBehaviour {
    blocks: Vec<Block>,
    requests: Vec<HeaderRequest>,
    misnumber_headers: bool,
    withhold_checkpoints: bool,
    corrupt_bodies: HashSet<u64>,
    body_delays: Vec<(RangeInclusive<u64>, Duration)>,
}

impl PeerBehaviour {
    /// The peer's block matching `header`, if it has that exact block.
    fn block_for(&self, header: &BlockHeader) -> Option<&Block> {
        self.blocks
            .get(header.number as usize)
            .filter(|block| block.hash() == header.hash())
    }
}

#[derive(Default)]
struct SourceState {
    peers: HashMap<PeerId, PeerBehaviour>,
    header_limit: Option<usize>,
    body_limit: Option<usize>,
    serve_sequence: usize,
    bodies_served: HashMap<u64, usize>,
}

/// Block source answering from each peer's own chain.
///
/// Requests to a peer it was never told about fail with
/// `PeerDisconnected`.
#[derive(Default)]
pub struct MockBlockSource {
    state: Mutex<SourceState>,
}

impl MockBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `blocks` as `peer`'s chain.
    pub fn serve_chain(&self, peer: PeerId, blocks: Vec<Block>) {
        self.state.lock().peers.entry(peer).or_default().blocks = blocks;
    }

    /// Number of header requests sent to `peer`.
    pub fn header_requests(&self, peer: PeerId) -> usize {
        self.requests(peer).len()
    }

    pub fn requests(&self, peer: PeerId) -> Vec<HeaderRequest> {
        self.state
            .lock()
            .peers
            .get(&peer)
            .map(|behaviour| behaviour.requests.clone())
            .unwrap_or_default()
    }

    /// Answer every header request with headers one number too high.
    pub fn misnumber_headers(&self, peer: PeerId) {
        self.behaviour(peer, |b| b.misnumber_headers = true);
    }

    /// Answer skeleton requests (skip > 0) with nothing.
    pub fn withhold_checkpoints(&self, peer: PeerId) {
        self.behaviour(peer, |b| b.withhold_checkpoints = true);
    }

    /// Cap every header response at `limit` headers.
    pub fn limit_headers_per_response(&self, limit: usize) {
        self.state.lock().header_limit = Some(limit);
    }

    /// Cap every body and receipt response at `limit` entries.
    pub fn limit_bodies_per_response(&self, limit: usize) {
        self.state.lock().body_limit = Some(limit);
    }

    /// Serve a body for `number` that does not match its header.
    pub fn corrupt_body(&self, peer: PeerId, number: u64) {
        self.behaviour(peer, |b| {
            b.corrupt_bodies.insert(number);
        });
    }

    /// Hold back body responses that include any of `numbers`.
    pub fn delay_bodies(&self, peer: PeerId, numbers: RangeInclusive<u64>, delay: Duration) {
        self.behaviour(peer, |b| b.body_delays.push((numbers, delay)));
    }

    /// Position of `number`'s first body in the order bodies were served.
    ///
    /// `usize::MAX` when it was never served.
    pub fn bodies_served_at(&self, number: u64) -> usize {
        self.state
            .lock()
            .bodies_served
            .get(&number)
            .copied()
            .unwrap_or(usize::MAX)
    }

    fn behaviour<F>(&self, peer: PeerId, update: F)
    where
        F: FnOnce(&mut PeerBehaviour),
    {
        update(self.state.lock().peers.entry(peer).or_default());
    }

    fn body_delay(&self, peer: PeerId, headers: &[BlockHeader]) -> Option<Duration> {
        let state = self.state.lock();
        let behaviour = state.peers.get(&peer)?;
        behaviour
            .body_delays
            .iter()
            .filter(|(numbers, _)| headers.iter().any(|h| numbers.contains(&h.number)))
            .map(|(_, delay)| *delay)
            .max()
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn download_headers(
        &self,
        peer: PeerId,
        request: HeaderRequest,
    ) -> Result<Vec<BlockHeader>, SyncError> {
        let mut state = self.state.lock();
        let limit = state.header_limit.unwrap_or(usize::MAX);
        let behaviour = state
            .peers
            .get_mut(&peer)
            .ok_or(SyncError::PeerDisconnected(peer))?;
        behaviour.requests.push(request);

        if behaviour.withhold_checkpoints && request.skip > 0 {
            return Ok(Vec::new());
        }

        let misnumber = behaviour.misnumber_headers;
        let headers = request
            .numbers()
            .map_while(|number| behaviour.blocks.get(number as usize))
            .take(limit)
            .map(|block| {
                let mut header = block.header.clone();
                if misnumber {
                    header.number += 1;
                }
                header
            })
            .collect();
        Ok(headers)
    }

    async fn download_bodies(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Vec<BlockBody>, SyncError> {
        if let Some(delay) = self.body_delay(peer, headers) {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let limit = state.body_limit.unwrap_or(usize::MAX);
        let behaviour = state
            .peers
            .get(&peer)
            .ok_or(SyncError::PeerDisconnected(peer))?;

        let served: Vec<(u64, BlockBody)> = headers
            .iter()
            .take(limit)
            .map_while(|header| behaviour.block_for(header))
            .map(|block| {
                let mut body = block.body.clone();
                if behaviour.corrupt_bodies.contains(&block.number()) {
                    body.ommers.push(BlockHeader::default());
                }
                (block.number(), body)
            })
            .collect();

        let mut bodies = Vec::with_capacity(served.len());
        for (number, body) in served {
            let position = state.serve_sequence;
            state.serve_sequence += 1;
            state.bodies_served.entry(number).or_insert(position);
            bodies.push(body);
        }
        Ok(bodies)
    }

    async fn download_receipts(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Vec<Vec<TransactionReceipt>>, SyncError> {
        let state = self.state.lock();
        let limit = state.body_limit.unwrap_or(usize::MAX);
        let behaviour = state
            .peers
            .get(&peer)
            .ok_or(SyncError::PeerDisconnected(peer))?;

        Ok(headers
            .iter()
            .take(limit)
            .map_while(|header| behaviour.block_for(header))
            .map(receipts_for)
            .collect())
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Local chain plus connected peers, wired to one bus.
pub struct TestNetwork {
    pub chain: Arc<MockChain>,
    pub source: Arc<MockBlockSource>,
    pub directory: Arc<InMemoryPeerDirectory>,
    pub bus: Arc<InMemoryEventBus>,
}

impl TestNetwork {
    pub fn new(local_blocks: Vec<Block>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        Self {
            chain: Arc::new(MockChain::new(local_blocks)),
            source: Arc::new(MockBlockSource::new()),
            directory: Arc::new(InMemoryPeerDirectory::with_bus(Arc::clone(&bus))),
            bus,
        }
    }

    /// Connect a peer advertising the head of `blocks`.
    pub fn add_peer(&self, peer: PeerId, blocks: Vec<Block>) {
        let state = PeerChainState::new(
            blocks.last().map_or(0, Block::number),
            total_difficulty(&blocks),
            blocks.last().map_or([0; 32], Block::hash),
        );
        self.add_peer_with_state(peer, state, blocks);
    }

    /// Connect a peer that advertises `state` but serves `blocks`.
    pub fn add_peer_with_state(&self, peer: PeerId, state: PeerChainState, blocks: Vec<Block>) {
        self.source.serve_chain(peer, blocks);
        self.directory.add_peer(peer, state);
    }

    pub fn ports(&self) -> SyncPorts {
        SyncPorts {
            peers: self.directory.clone(),
            source: self.source.clone(),
            chain: self.chain.clone(),
            importer: self.chain.clone(),
            world_state: self.chain.clone(),
        }
    }
}
