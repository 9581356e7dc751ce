//! Integration tests for slot, range and concurrent orchestration.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use gair_core::{AttributeRecord, AttributeStore, Field, Indicator, IndicatorTable, StoreError};
use gair_runner::{ComputeError, ComputeOptions, ComputeRequest, Orchestrator, SyntheticStore};
use proptest::prelude::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn synthetic(count: usize) -> Arc<SyntheticStore> {
    Arc::new(SyntheticStore::with_universe(count, d(2024, 1, 1), d(2024, 6, 28)))
}

fn orchestrator(store: Arc<dyn AttributeStore>, fragment_size: usize) -> Orchestrator {
    Orchestrator::new(
        store,
        ComputeOptions {
            fragment_size,
            workers: Some(3),
            fetch_threads: 2,
        },
    )
}

fn assert_same(a: &IndicatorTable, b: &IndicatorTable) {
    assert_eq!(a.indicators(), b.indicators());
    assert_eq!(a.dates(), b.dates());
    assert_eq!(a.symbols(), b.symbols());
    assert!(a.same_values(b), "tables differ");
}

/// Fails every fetch whose symbol filter includes `poisoned`.
struct FailingStore {
    inner: SyntheticStore,
    poisoned: String,
}

impl AttributeStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn list_trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        self.inner.list_trading_days(start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_symbols()
    }

    fn symbol_names(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.inner.symbol_names()
    }

    fn fetch_attribute(
        &self,
        symbols: Option<&[String]>,
        trading_days: Option<&[NaiveDate]>,
        field: Field,
    ) -> Result<Vec<AttributeRecord>, StoreError> {
        if symbols.map_or(true, |s| s.contains(&self.poisoned)) {
            return Err(StoreError::Unavailable(format!("{} is offline", self.poisoned)));
        }
        self.inner.fetch_attribute(symbols, trading_days, field)
    }
}

#[test]
fn concurrent_matches_slot_for_any_fragment_size() {
    let store = synthetic(7);
    let date = d(2024, 6, 28);
    let reference = orchestrator(store.clone(), 200)
        .compute_slot(None, date, None)
        .unwrap();
    assert_eq!(reference.symbols().len(), 7);

    for fragment_size in [1, 2, 3, 200] {
        let orch = orchestrator(store.clone(), fragment_size);
        let fetched = orch.compute_slot_concurrent(None, date, None).unwrap();
        assert_same(&reference, &fetched);

        let bundle = orch
            .load_bundle(&store.list_symbols().unwrap(), date, date)
            .unwrap();
        let supplied = orch.compute_slot_concurrent(None, date, Some(&bundle)).unwrap();
        assert_same(&reference, &supplied);
    }
}

#[test]
fn concurrent_output_is_sorted_by_symbol() {
    let store = synthetic(5);
    let orch = orchestrator(store, 2);
    let symbols: Vec<String> = ["000004.SZ", "000001.SZ", "000003.SZ", "000001.SZ"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let table = orch
        .compute_slot_concurrent(Some(&symbols), d(2024, 5, 15), None)
        .unwrap();
    assert_eq!(table.symbols(), &["000001.SZ", "000003.SZ", "000004.SZ"]);
}

#[test]
fn range_equals_stacked_slots() {
    let store = synthetic(4);
    let orch = orchestrator(store, 200);
    let dates = vec![d(2024, 6, 27), d(2024, 6, 24), d(2024, 6, 26), d(2024, 6, 24)];
    let range = orch.compute_range(None, &dates, None).unwrap();
    assert_eq!(range.dates(), &[d(2024, 6, 24), d(2024, 6, 26), d(2024, 6, 27)]);

    for &date in range.dates() {
        let slot = orch.compute_slot(None, date, None).unwrap();
        for indicator in Indicator::ALL {
            let a = range.series(indicator, date).unwrap();
            let b = slot.series(indicator, date).unwrap();
            assert!(a.same_values(&b), "{indicator} on {date}");
        }
    }
}

#[test]
fn range_with_non_trading_day_fails() {
    let orch = orchestrator(synthetic(2), 200);
    // 2024-06-22 is a Saturday
    let dates = vec![d(2024, 6, 20), d(2024, 6, 22), d(2024, 6, 24)];
    let err = orch.compute_range(None, &dates, None).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn slot_on_unknown_date_is_not_found() {
    let orch = orchestrator(synthetic(2), 200);
    let err = orch.compute_slot(None, d(2024, 6, 22), None).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn failing_fragment_aborts_the_batch() {
    let store = Arc::new(FailingStore {
        inner: SyntheticStore::with_universe(4, d(2024, 1, 1), d(2024, 3, 29)),
        poisoned: "000003.SZ".into(),
    });
    let orch = orchestrator(store, 2);
    let err = orch
        .compute_slot_concurrent(None, d(2024, 3, 29), None)
        .unwrap_err();
    match err {
        ComputeError::Worker { fragment, source } => {
            assert_eq!(fragment, 1);
            assert!(source.to_string().contains("offline"));
        }
        other => panic!("expected worker failure, got {other}"),
    }
}

#[test]
fn compute_dispatches_requests() {
    let store = synthetic(3);
    let orch = orchestrator(store, 2);
    let date = d(2024, 4, 10);
    let slot = orch
        .compute(&ComputeRequest::Slot { symbols: None, date })
        .unwrap();
    let concurrent = orch
        .compute(&ComputeRequest::Concurrent { symbols: None, date })
        .unwrap();
    let range = orch
        .compute(&ComputeRequest::Range {
            symbols: None,
            dates: vec![date],
        })
        .unwrap();
    assert_same(&slot, &concurrent);
    assert_same(&slot, &range);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Fragment size and worker count never change the concurrent result.
    #[test]
    fn concurrent_is_partition_invariant(fragment_size in 1usize..12, workers in 1usize..5) {
        let store = synthetic(9);
        let date = d(2024, 5, 31);
        let reference = orchestrator(store.clone(), 200).compute_slot(None, date, None).unwrap();
        let orch = Orchestrator::new(
            store,
            ComputeOptions { fragment_size, workers: Some(workers), fetch_threads: 1 },
        );
        let table = orch.compute_slot_concurrent(None, date, None).unwrap();
        prop_assert_eq!(table.symbols(), reference.symbols());
        prop_assert!(table.same_values(&reference));
    }
}
