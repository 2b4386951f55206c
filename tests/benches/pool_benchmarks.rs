//! # Transaction Pool Benchmarks
//!
//! | Operation | Expectation |
//! |-----------|-------------|
//! | Admission below capacity | O(log n) |
//! | Admission at capacity (eviction) | O(log n) |
//! | Block selection | O(k log n) for k selected |
//! | Block pruning | O(block size + senders touched) |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use qc_06_mempool::{
    AccountStateView, BasicTransactionValidator, NoOpPublisher, SystemTimeSource,
    TransactionOrigin, TransactionPoolApi, TransactionPoolConfig, TransactionPoolService,
};
use shared_types::{Address, Block, BlockBody, SignedTransaction, U256};
use std::sync::Arc;

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

fn tx(sender: u32, nonce: u64, gwei: u64) -> SignedTransaction {
    let mut from = [0u8; 20];
    from[..4].copy_from_slice(&sender.to_be_bytes());
    SignedTransaction {
        from,
        to: Some([0xEE; 20]),
        value: U256::zero(),
        nonce,
        gas_price: U256::from(gwei) * U256::from(1_000_000_000u64),
        gas_limit: 21_000,
        data: vec![],
        signature: [1u8; 64],
    }
}

fn pool(capacity: usize) -> Arc<dyn TransactionPoolApi> {
    Arc::new(TransactionPoolService::new(
        TransactionPoolConfig {
            max_pending_transactions: capacity,
            ..TransactionPoolConfig::default()
        },
        Arc::new(BasicTransactionValidator::default()),
        Arc::new(ZeroNonces),
        Arc::new(SystemTimeSource),
        Arc::new(NoOpPublisher),
    ))
}

fn filled(capacity: usize) -> Arc<dyn TransactionPoolApi> {
    let pool = pool(capacity);
    for i in 0..capacity as u32 {
        let _ = pool.add_transaction(tx(i, 0, 1 + u64::from(i % 100)), TransactionOrigin::Remote);
    }
    pool
}

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-06-admission");

    for capacity in [1_000usize, 4_096] {
        group.bench_with_input(
            BenchmarkId::new("fill_to_capacity", capacity),
            &capacity,
            |b, &capacity| b.iter(|| black_box(filled(capacity).size())),
        );

        group.bench_with_input(
            BenchmarkId::new("evicting_insert", capacity),
            &capacity,
            |b, &capacity| {
                b.iter_batched(
                    || filled(capacity),
                    |pool| {
                        black_box(pool.add_transaction(
                            tx(u32::MAX, 0, 500),
                            TransactionOrigin::Remote,
                        ))
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_block_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-06-block");

    let pool_for_selection = filled(4_096);
    group.bench_function("select_for_block_500", |b| {
        b.iter(|| black_box(pool_for_selection.select_for_block(500, 30_000_000).len()))
    });

    let included: Vec<_> = (0..500u32).map(|i| tx(i, 0, 1 + u64::from(i % 100))).collect();
    let block = Block {
        body: BlockBody {
            transactions: included,
            ommers: vec![],
        },
        ..Default::default()
    };
    group.bench_function("on_block_added_500", |b| {
        b.iter_batched(
            || filled(4_096),
            |pool| black_box(pool.on_block_added(&block)),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_admission, bench_block_paths);
criterion_main!(benches);
