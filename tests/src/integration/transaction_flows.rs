//! # Transaction Flows
//!
//! Pool and propagation wired through the shared bus: admissions become
//! announcements, remote transactions are never echoed to their sender,
//! and peer disconnects reach the tracker.

#[cfg(test)]
mod tests {
    use crate::init_test_tracing;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use qc_05_transaction_propagation::{
        PoolGateway, PropagationConfig, PropagationError, TransactionNetwork,
        TransactionPropagationApi, TransactionPropagationService,
    };
    use qc_06_mempool::{
        AccountStateView, BasicTransactionValidator, BusPublisher, NoOpPublisher,
        SystemTimeSource, TransactionOrigin, TransactionPoolApi, TransactionPoolConfig,
        TransactionPoolService,
    };
    use qc_13_chain_sync::InMemoryPeerDirectory;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, Subscription};
    use shared_types::{Address, Hash, NodeId, PeerChainState, PeerId, SignedTransaction, U256};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn peer(n: u8) -> PeerId {
        NodeId([n; 32])
    }

    fn tx(sender: u8, nonce: u64, gwei: u64) -> SignedTransaction {
        SignedTransaction {
            from: [sender; 20],
            to: Some([0xEE; 20]),
            value: U256::from(1u64),
            nonce,
            gas_price: U256::from(gwei) * U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            data: vec![],
            signature: [sender; 64],
        }
    }

    struct ZeroNonces;

    impl AccountStateView for ZeroNonces {
        fn account_nonce(&self, _address: &Address) -> u64 {
            0
        }

        fn account_balance(&self, _address: &Address) -> U256 {
            U256::MAX
        }

        fn chain_head_number(&self) -> u64 {
            0
        }
    }

    /// Network that records every announcement.
    struct RecordingNetwork {
        peers: Mutex<Vec<PeerId>>,
        sent: Mutex<Vec<(PeerId, Vec<Hash>)>>,
    }

    impl RecordingNetwork {
        fn with_peers(peers: &[PeerId]) -> Self {
            Self {
                peers: Mutex::new(peers.to_vec()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_to(&self, target: PeerId) -> HashSet<Hash> {
            self.sent
                .lock()
                .iter()
                .filter(|(p, _)| *p == target)
                .flat_map(|(_, hashes)| hashes.iter().copied())
                .collect()
        }
    }

    impl TransactionNetwork for RecordingNetwork {
        fn connected_peers(&self) -> Vec<PeerId> {
            self.peers.lock().clone()
        }

        fn send_transaction_hashes(
            &self,
            peer: PeerId,
            hashes: &[Hash],
        ) -> Result<(), PropagationError> {
            if !self.peers.lock().contains(&peer) {
                return Err(PropagationError::PeerNotConnected(peer));
            }
            self.sent.lock().push((peer, hashes.to_vec()));
            Ok(())
        }
    }

    type Propagation = TransactionPropagationService<RecordingNetwork, PoolGateway>;

    struct Node {
        bus: Arc<InMemoryEventBus>,
        pool: Arc<dyn TransactionPoolApi>,
        network: Arc<RecordingNetwork>,
        propagation: Arc<Propagation>,
    }

    fn node(peers: &[PeerId], pool_config: TransactionPoolConfig) -> Node {
        let bus = Arc::new(InMemoryEventBus::new());
        let pool: Arc<dyn TransactionPoolApi> = Arc::new(TransactionPoolService::new(
            pool_config,
            Arc::new(BasicTransactionValidator::default()),
            Arc::new(ZeroNonces),
            Arc::new(SystemTimeSource),
            Arc::new(BusPublisher::new(bus.clone())),
        ));
        let network = Arc::new(RecordingNetwork::with_peers(peers));
        let propagation = Arc::new(TransactionPropagationService::new(
            PropagationConfig::for_testing(),
            network.clone(),
            Arc::new(PoolGateway::new(pool.clone())),
        ));
        Node {
            bus,
            pool,
            network,
            propagation,
        }
    }

    fn subscribe(bus: &InMemoryEventBus) -> Subscription {
        bus.subscribe(EventFilter::topics(vec![
            EventTopic::Transactions,
            EventTopic::Peers,
        ]))
    }

    /// Feed every queued bus event to the propagation service.
    fn drain(subscription: &mut Subscription, propagation: &Propagation) {
        while let Ok(Some(event)) = subscription.try_recv() {
            propagation.handle_event(&event);
        }
    }

    #[tokio::test]
    async fn test_local_transaction_reaches_every_peer() {
        init_test_tracing();
        let node = node(&[peer(1), peer(2)], TransactionPoolConfig::default());
        let shutdown = CancellationToken::new();
        let runner = tokio::spawn(node.propagation.clone().run(
            subscribe(&node.bus),
            Duration::from_millis(5),
            shutdown.clone(),
        ));

        let hash = node
            .pool
            .add_transaction(tx(1, 0, 2), TransactionOrigin::Local)
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !(node.network.sent_to(peer(1)).contains(&hash)
                && node.network.sent_to(peer(2)).contains(&hash))
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transaction was not announced to both peers");

        shutdown.cancel();
        runner.await.unwrap();
    }

    #[test]
    fn test_remote_transaction_not_echoed_to_sender() {
        let node = node(&[peer(1), peer(2), peer(3)], TransactionPoolConfig::default());
        let mut events = subscribe(&node.bus);
        let remote = tx(7, 0, 3);
        let hash = remote.hash();

        let report = node
            .propagation
            .on_transactions_received(peer(1), vec![remote]);
        assert_eq!(report.accepted, 1);

        drain(&mut events, &node.propagation);
        let stats = node.propagation.broadcast_pending();

        assert_eq!(stats.peers_reached, 2);
        assert!(node.network.sent_to(peer(1)).is_empty());
        assert!(node.network.sent_to(peer(2)).contains(&hash));
        assert!(node.network.sent_to(peer(3)).contains(&hash));

        // Nothing left to send on the next tick
        assert_eq!(node.propagation.broadcast_pending().hashes_sent, 0);
    }

    #[test]
    fn test_announced_hash_is_not_sent_back() {
        let node = node(&[peer(1), peer(2)], TransactionPoolConfig::default());
        let mut events = subscribe(&node.bus);
        let local = tx(8, 0, 2);

        node.propagation.on_hashes_announced(peer(2), &[local.hash()]);
        node.pool
            .add_transaction(local.clone(), TransactionOrigin::Local)
            .unwrap();
        drain(&mut events, &node.propagation);
        node.propagation.broadcast_pending();

        assert!(node.network.sent_to(peer(1)).contains(&local.hash()));
        assert!(node.network.sent_to(peer(2)).is_empty());
    }

    #[test]
    fn test_peer_disconnect_on_bus_clears_tracking() {
        let node = node(&[peer(1)], TransactionPoolConfig::default());
        let mut events = subscribe(&node.bus);
        let directory = InMemoryPeerDirectory::with_bus(node.bus.clone());
        directory.add_peer(peer(1), PeerChainState::default());

        node.propagation
            .on_transactions_received(peer(1), vec![tx(9, 0, 2)]);
        drain(&mut events, &node.propagation);
        assert_eq!(node.propagation.tracker().tracked_peers(), 1);

        directory.remove_peer(&peer(1));
        drain(&mut events, &node.propagation);

        assert_eq!(node.propagation.tracker().tracked_peers(), 0);
    }

    #[test]
    fn test_rejected_remote_transactions_are_counted() {
        let node = node(&[peer(1)], TransactionPoolConfig::default());
        let cheap = SignedTransaction {
            gas_price: U256::one(),
            ..tx(4, 0, 1)
        };
        let good = tx(5, 0, 2);

        let report = node
            .propagation
            .on_transactions_received(peer(1), vec![cheap, good.clone(), good]);

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(node.pool.size(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_received_transactions_never_overflow_pool(
            prices in proptest::collection::vec(1u64..50, 1..40),
        ) {
            let config = TransactionPoolConfig::for_testing();
            let capacity = config.max_pending_transactions;
            let node = node(&[peer(1)], config);
            let txs: Vec<_> = prices
                .iter()
                .enumerate()
                .map(|(i, gwei)| tx(i as u8 + 1, 0, *gwei))
                .collect();

            let report = node.propagation.on_transactions_received(peer(1), txs);

            prop_assert!(node.pool.size() <= capacity);
            prop_assert_eq!(report.accepted + report.rejected, prices.len());
        }
    }

    #[test]
    fn test_pool_without_bus_still_accepts_remote() {
        let pool: Arc<dyn TransactionPoolApi> = Arc::new(TransactionPoolService::new(
            TransactionPoolConfig::default(),
            Arc::new(BasicTransactionValidator::default()),
            Arc::new(ZeroNonces),
            Arc::new(SystemTimeSource),
            Arc::new(NoOpPublisher),
        ));
        let network = Arc::new(RecordingNetwork::with_peers(&[peer(1)]));
        let propagation = TransactionPropagationService::new(
            PropagationConfig::for_testing(),
            network,
            Arc::new(PoolGateway::new(pool.clone())),
        );

        let report = propagation.on_transactions_received(peer(1), vec![tx(3, 0, 2)]);

        assert_eq!(report.accepted, 1);
        assert_eq!(pool.size(), 1);
    }
}
