use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use seedgen::{
    Artifact, Batcher, DefaultEngine, FlushPolicy, JobDescriptor, Network, Strength,
};
use std::time::Instant;

// Artifacts pushed per batcher iteration.
const BATCH: usize = 4096;

fn bench_engine(c: &mut Criterion) {
    let engine = DefaultEngine::default();
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(1));

    let jobs = [
        ("bip39/12", JobDescriptor::baseline(Strength::Bits128)),
        ("bip39/24", JobDescriptor::baseline(Strength::Bits256)),
        ("bip44/btc", JobDescriptor::bip44(Strength::Bits128, Network::Bitcoin)),
        ("bip44/eth", JobDescriptor::bip44(Strength::Bits128, Network::Ethereum)),
        // Unsupported network: measures the fallback path.
        ("bip44/ltc", JobDescriptor::bip44(Strength::Bits128, Network::Litecoin)),
    ];

    for (name, job) in jobs {
        group.bench_function(name, |b| b.iter(|| black_box(engine.execute(&job))));
    }

    group.finish();
}

fn bench_batcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("batcher");
    group.throughput(Throughput::Elements(BATCH as u64));

    let artifact = Artifact::baseline(
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
            .to_string(),
        Strength::Bits128,
    );

    group.bench_function(format!("push_commit/{BATCH}"), |b| {
        b.iter_custom(|iters| {
            let now = Instant::now();
            let mut batcher = Batcher::new(
                FlushPolicy {
                    max_batch: Some(BATCH),
                    max_age: None,
                },
                now,
            );
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..BATCH {
                    if batcher.push(artifact.clone(), now) {
                        black_box(batcher.pending());
                        batcher.commit(now);
                    }
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_engine, bench_batcher);
criterion_main!(benches);
