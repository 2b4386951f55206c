//! # Chain Sync Flows
//!
//! Sync against simulated peers, with the pool following imported blocks
//! over the shared bus.

#[cfg(test)]
mod tests {
    use crate::init_test_tracing;
    use async_trait::async_trait;
    use qc_06_mempool::{
        AccountStateView, BasicTransactionValidator, BlockAddedSubscriber, NoOpPublisher,
        SystemTimeSource, TransactionOrigin, TransactionPoolApi, TransactionPoolConfig,
        TransactionPoolService,
    };
    use qc_13_chain_sync::test_utils::{build_chain, total_difficulty, MockChain, TestNetwork};
    use qc_13_chain_sync::{
        BlockImporter, ChainSyncApi, ChainSyncService, PeerDirectory, SyncConfig, SyncError,
        SyncOutcome, SyncPorts, ValidationModes,
    };
    use shared_bus::{BlockAddedEvent, BlockchainEvent, EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::{
        Address, Block, DisconnectReason, NodeId, PeerChainState, TransactionReceipt, U256,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const HONEST: NodeId = NodeId([1; 32]);
    const FAULTY: NodeId = NodeId([2; 32]);
    const SHORT: NodeId = NodeId([3; 32]);

    /// Importer that announces every accepted block on the bus.
    struct AnnouncingImporter {
        chain: Arc<MockChain>,
        bus: Arc<InMemoryEventBus>,
    }

    impl AnnouncingImporter {
        fn announce(&self, block: &Block) {
            self.bus.emit(BlockchainEvent::BlockAdded(BlockAddedEvent {
                block: block.clone(),
                is_new_head: true,
            }));
        }
    }

    #[async_trait]
    impl BlockImporter for AnnouncingImporter {
        async fn import_block(&self, block: &Block, modes: ValidationModes) -> bool {
            let imported = self.chain.import_block(block, modes).await;
            if imported {
                self.announce(block);
            }
            imported
        }

        async fn fast_import_block(
            &self,
            block: &Block,
            receipts: &[TransactionReceipt],
            modes: ValidationModes,
        ) -> bool {
            let imported = self.chain.fast_import_block(block, receipts, modes).await;
            if imported {
                self.announce(block);
            }
            imported
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

    fn full_sync(network: &TestNetwork, ports: SyncPorts) -> ChainSyncService {
        ChainSyncService::full(SyncConfig::for_testing(), ports, network.bus.clone())
            .expect("valid config")
    }

    #[tokio::test]
    async fn test_run_syncs_to_heaviest_peer() {
        init_test_tracing();
        let chain = build_chain(81);
        let network = TestNetwork::new(chain[..=0].to_vec());
        network.add_peer(SHORT, chain[..=30].to_vec());
        network.add_peer(HONEST, chain.clone());
        let service = Arc::new(full_sync(&network, network.ports()));
        let shutdown = CancellationToken::new();

        let runner = tokio::spawn({
            let service = service.clone();
            let shutdown = shutdown.clone();
            async move { service.run(shutdown).await }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while network.chain.head_number() < 80 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sync did not reach the best peer's head");

        shutdown.cancel();
        runner.await.unwrap().unwrap();
        assert_eq!(network.chain.imported(), (1..=80).collect::<Vec<_>>());
        assert!(network.directory.disconnections().is_empty());
    }

    #[tokio::test]
    async fn test_faulty_peer_dropped_then_sync_resumes_from_other_peer() {
        init_test_tracing();
        let chain = build_chain(41);
        let network = TestNetwork::new(chain[..=0].to_vec());
        network.add_peer(FAULTY, chain.clone());
        let td = total_difficulty(&chain);
        network.add_peer_with_state(
            HONEST,
            PeerChainState::new(40, td - U256::one(), chain[40].hash()),
            chain.clone(),
        );
        network.source.corrupt_body(FAULTY, 15);
        let service = full_sync(&network, network.ports());

        let err = service
            .sync_once(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::InvalidBody { peer: FAULTY, number: 15 });
        assert_eq!(
            network.directory.disconnections(),
            vec![(FAULTY, DisconnectReason::BreachOfProtocol)]
        );
        let stalled_at = network.chain.head_number();
        assert!(stalled_at < 15);

        let outcome = service.sync_once(&CancellationToken::new()).await.unwrap();
        let SyncOutcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.blocks_imported, 40 - stalled_at);
        assert_eq!(network.chain.head_number(), 40);
        assert!(!network.directory.is_connected(&FAULTY));
    }

    #[tokio::test]
    async fn test_pool_prunes_transactions_included_by_sync() {
        init_test_tracing();
        let chain = build_chain(31);
        let network = TestNetwork::new(chain[..=0].to_vec());
        network.add_peer(HONEST, chain.clone());

        let pool: Arc<dyn TransactionPoolApi> = Arc::new(TransactionPoolService::new(
            TransactionPoolConfig::default(),
            Arc::new(BasicTransactionValidator::default()),
            Arc::new(ZeroNonces),
            Arc::new(SystemTimeSource),
            Arc::new(NoOpPublisher),
        ));
        let included: Vec<_> = chain
            .iter()
            .flat_map(|block| block.body.transactions.iter().cloned())
            .collect();
        for tx in &included {
            pool.add_transaction(tx.clone(), TransactionOrigin::Remote)
                .expect("generated transactions are admissible");
        }
        assert_eq!(pool.size(), included.len());

        let shutdown = CancellationToken::new();
        let subscriber = tokio::spawn(BlockAddedSubscriber::new(pool.clone()).run(
            network.bus.subscribe(EventFilter::topics(vec![EventTopic::Chain])),
            shutdown.clone(),
        ));

        let ports = SyncPorts {
            importer: Arc::new(AnnouncingImporter {
                chain: network.chain.clone(),
                bus: network.bus.clone(),
            }),
            ..network.ports()
        };
        let outcome = full_sync(&network, ports)
            .sync_once(&CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));

        tokio::time::timeout(Duration::from_secs(2), async {
            while pool.size() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pool kept transactions that sync imported");

        shutdown.cancel();
        subscriber.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_mid_round_keeps_chain_consistent() {
        init_test_tracing();
        let chain = build_chain(201);
        let network = TestNetwork::new(chain[..=0].to_vec());
        network.add_peer(HONEST, chain.clone());
        network
            .source
            .delay_bodies(HONEST, 1..=200, Duration::from_millis(5));
        let service = full_sync(&network, network.ports());
        let shutdown = CancellationToken::new();

        let canceller = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                shutdown.cancel();
            })
        };
        let result = service.sync_once(&shutdown).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(SyncError::Cancelled) | Ok(_)));
        let head = network.chain.head_number();
        assert_eq!(network.chain.imported(), (1..=head).collect::<Vec<_>>());
        assert!(network.directory.disconnections().is_empty());
    }
}
