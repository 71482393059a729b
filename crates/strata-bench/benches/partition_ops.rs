//! Criterion micro-benchmarks for strip planning.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_bench::{reference_profile, stress_profile};
use strata_comm::{plan, plan_all};
use strata_core::Rank;

/// Benchmark: plan every rank of the reference profile.
fn bench_plan_all_reference(c: &mut Criterion) {
    let config = reference_profile();
    c.bench_function("plan_all_reference", |b| {
        b.iter(|| {
            let ds = plan_all(config.worker_count, config.width, config.height);
            black_box(&ds);
        });
    });
}

/// Benchmark: plan the last rank of the stress profile.
fn bench_plan_last_rank_stress(c: &mut Criterion) {
    let config = stress_profile();
    let last = Rank(config.worker_count - 1);
    c.bench_function("plan_last_rank_stress", |b| {
        b.iter(|| {
            let d = plan(black_box(last), config.worker_count, config.width, config.height);
            black_box(&d);
        });
    });
}

criterion_group!(benches, bench_plan_all_reference, bench_plan_last_rank_stress);
criterion_main!(benches);
