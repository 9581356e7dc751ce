//! Criterion benchmarks for orchestration.
//!
//! Run with: `cargo bench -p gair-runner`
//!
//! Benchmarks:
//! - Sequential slot vs. fragment-parallel slot over a supplied bundle
//! - Parallel field fan-out when loading a bundle from the store

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use gair_core::AttributeStore;
use gair_runner::{fetch_attributes, ComputeOptions, Orchestrator, SyntheticStore};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bench_slot_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_modes");
    group.sample_size(20);

    let store = Arc::new(SyntheticStore::with_universe(600, d(2024, 1, 1), d(2024, 6, 28)));
    let date = d(2024, 6, 28);
    for fragment_size in [50, 200, 600] {
        let orch = Orchestrator::new(
            store.clone(),
            ComputeOptions {
                fragment_size,
                ..ComputeOptions::default()
            },
        );
        let symbols = store.list_symbols().unwrap();
        let bundle = orch.load_bundle(&symbols, date, date).unwrap();

        group.bench_with_input(
            BenchmarkId::new("concurrent", fragment_size),
            &bundle,
            |b, bundle| {
                b.iter(|| {
                    orch.compute_slot_concurrent(None, date, Some(black_box(bundle)))
                        .unwrap()
                })
            },
        );
        if fragment_size == 600 {
            group.bench_with_input(BenchmarkId::new("sequential", 600), &bundle, |b, bundle| {
                b.iter(|| orch.compute_slot(None, date, Some(black_box(bundle))).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_fetch_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetch_attributes");
    group.sample_size(20);

    let store = SyntheticStore::with_universe(100, d(2024, 1, 1), d(2024, 6, 28));
    let symbols = store.list_symbols().unwrap();
    let days = store.calendar().days().to_vec();
    for threads in [1, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                fetch_attributes(&store, &symbols, &days, &gair_core::Field::ALL, threads).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_slot_modes, bench_fetch_fan_out);
criterion_main!(benches);
