//! # Chain Sync Benchmarks
//!
//! | Path | Expectation |
//! |------|-------------|
//! | Checkpoint numbers | linear in checkpoints per request |
//! | Range partition | linear in checkpoints, no header hashing beyond boundaries |
//! | Ancestor search | O(log n) probes |
//! | Peer tracker | O(1) per hash |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qc_05_transaction_propagation::PeerTransactionTracker;
use qc_13_chain_sync::test_utils::build_chain;
use qc_13_chain_sync::{checkpoint_numbers, partition_into_ranges, AncestorSearch};
use shared_types::NodeId;

fn bench_checkpoints(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-13-checkpoints");

    for max in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(max as u64));
        group.bench_with_input(BenchmarkId::new("checkpoint_numbers", max), &max, |b, &max| {
            b.iter(|| checkpoint_numbers(black_box(1_000), black_box(10_000_000), 200, max))
        });
    }

    let chain = build_chain(2_001);
    let start = chain[0].header.clone();
    let checkpoints: Vec<_> = (1..=10).map(|k| chain[k * 200].header.clone()).collect();
    group.bench_function("partition_10_ranges", |b| {
        b.iter(|| {
            partition_into_ranges(NodeId([1; 32]), start.clone(), checkpoints.clone())
                .map(|ranges| black_box(ranges.len()))
        })
    });

    group.finish();
}

fn bench_ancestor_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-13-ancestor");

    for height in [1_000u64, 1_000_000, 100_000_000] {
        let fork_point = height / 3;
        group.bench_with_input(BenchmarkId::new("bisect", height), &height, |b, &height| {
            b.iter(|| {
                let mut search = AncestorSearch::new(height);
                while let Some(probe) = search.next_probe() {
                    search.record(probe, probe <= fork_point);
                }
                black_box(search.ancestor())
            })
        });
    }

    group.finish();
}

fn bench_peer_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-05-tracker");
    let peers: Vec<NodeId> = (0..50u8).map(|n| NodeId([n; 32])).collect();
    let hashes: Vec<[u8; 32]> = (0..1_000u32)
        .map(|i| {
            let mut hash = [0u8; 32];
            hash[..4].copy_from_slice(&i.to_be_bytes());
            hash
        })
        .collect();

    group.throughput(Throughput::Elements((peers.len() * hashes.len()) as u64));
    group.bench_function("queue_and_claim_50x1000", |b| {
        b.iter(|| {
            let tracker = PeerTransactionTracker::new(4_096);
            for peer in &peers {
                tracker.mark_transactions_as_seen(*peer, hashes[..100].iter().copied());
                for hash in &hashes {
                    tracker.add_to_peer_send_queue(*peer, *hash);
                }
            }
            let mut sent = 0;
            for peer in &peers {
                sent += tracker.get_transactions_to_send_to_peer(peer).len();
            }
            black_box(sent)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_checkpoints,
    bench_ancestor_search,
    bench_peer_tracker
);
criterion_main!(benches);
