//! # Coalescer Benchmark
//!
//! Measures the hot paths every scene mutation and every tick go through:
//! 1. Enqueue with heavy coalescing (few identities, many updates)
//! 2. Enqueue with no coalescing (every update a new identity)
//! 3. Budgeted drain
//! 4. Full-scan ordering for a crowded region
//!
//! Target: enqueue well under 1µs, ordering of 10k parts under 5ms.

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vista_core::{EntityId, GroupSnapshot, PartSnapshot, PresenceSnapshot, UpdateFlags, Vec3};
use vista_interest::{EntityUpdate, InterestConfig, PendingQueue, Prioritizer, Requeue};

fn parts(count: u64) -> Vec<Arc<PartSnapshot>> {
    (0..count)
        .map(|i| Arc::new(PartSnapshot::root(EntityId(i), EntityId(i + 1_000_000), Vec3::ZERO)))
        .collect()
}

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalescer_enqueue");
    const UPDATES: u64 = 10_000;
    group.throughput(Throughput::Elements(UPDATES));

    for identities in [16_u64, 1_000, 10_000] {
        let parts = parts(identities);
        for (name, mode) in [("in_place", Requeue::InPlace), ("to_tail", Requeue::ToTail)] {
            group.bench_with_input(BenchmarkId::new(name, identities), &identities, |b, _| {
                b.iter(|| {
                    let queue = PendingQueue::new(mode);
                    for i in 0..UPDATES {
                        let part = &parts[(i % identities) as usize];
                        queue.enqueue(
                            part.id,
                            EntityUpdate::part(Arc::clone(part), UpdateFlags::POSITION),
                        );
                    }
                    black_box(queue.len())
                });
            });
        }
    }

    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalescer_drain");
    let parts = parts(10_000);

    for budget in [60_usize, 100, 1_000] {
        group.throughput(Throughput::Elements(budget as u64));
        group.bench_with_input(BenchmarkId::new("drain", budget), &budget, |b, &budget| {
            let queue = PendingQueue::new(Requeue::InPlace);
            b.iter(|| {
                if queue.len() < budget {
                    for part in &parts {
                        queue.enqueue(part.id, EntityUpdate::part(Arc::clone(part), UpdateFlags::TERSE));
                    }
                }
                black_box(queue.drain(budget))
            });
        });
    }

    group.finish();
}

fn bench_order_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("prioritizer_full_scan");
    let prioritizer = Prioritizer::new(&InterestConfig::default());
    let viewer = PresenceSnapshot::new(EntityId(1), Vec3::new(128.0, 128.0, 20.0), 128.0);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for group_count in [100_u64, 1_000, 5_000] {
        let groups: Vec<Arc<GroupSnapshot>> = (0..group_count)
            .map(|i| {
                let id = EntityId(10 + i * 4);
                let at = Vec3::new(rng.gen_range(0.0..256.0), rng.gen_range(0.0..256.0), 20.0);
                Arc::new(GroupSnapshot::new(
                    id,
                    at,
                    2.0,
                    vec![
                        PartSnapshot::root(EntityId(id.0 + 1), id, at),
                        PartSnapshot::child(EntityId(id.0 + 2), id, at + Vec3::new(1.0, 0.0, 0.0)),
                    ],
                ))
            })
            .collect();

        group.throughput(Throughput::Elements(group_count * 2));
        group.bench_with_input(BenchmarkId::new("order", group_count), &groups, |b, groups| {
            b.iter(|| black_box(prioritizer.order_full_scan(&viewer, groups)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue, bench_drain, bench_order_full_scan);
criterion_main!(benches);
