//! Factor evaluation against hand-built attribute stores.

use chrono::NaiveDate;
use gair_core::{
    AttributeStore, CalcArgs, DataBundle, Factor, Field, InMemoryStore, Indicator, MAX_LOOKBACK,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut days = Vec::with_capacity(n);
    while days.len() < n {
        use chrono::Datelike;
        if day.weekday().number_from_monday() <= 5 {
            days.push(day);
        }
        day = day.succ_opt().unwrap();
    }
    days
}

fn constant_store(n: usize, value_a: f64, value_b: f64) -> InMemoryStore {
    let mut store = InMemoryStore::new(trading_days(n));
    store.fill_all("600000.SH", value_a);
    store.fill_all("000001.SZ", value_b);
    store
}

fn full_bundle(store: &InMemoryStore) -> DataBundle {
    let symbols = store.list_symbols().unwrap();
    DataBundle::fetch(store, &symbols, store.calendar().days(), &Field::ALL).unwrap()
}

// ── Constant inputs ──────────────────────────────────────────────────

#[test]
fn all_ones_and_minus_ones_give_plus_minus_three() {
    let store = constant_store(MAX_LOOKBACK + 1, -1.0, 1.0);
    let bundle = full_bundle(&store);
    let date = store.calendar().last().unwrap();
    let args = CalcArgs::with_bundle(&bundle, date);

    // symbols sort as 000001.SZ, 600000.SH
    for factor in [Factor::Q, Factor::M, Factor::W, Factor::D] {
        assert_eq!(factor.evaluate(&args).unwrap().values(), &[3.0, -3.0], "{factor}");
    }
    assert_eq!(
        Indicator::Ms.derive(&args).unwrap().values(),
        &[6.0, -6.0]
    );
}

#[test]
fn store_and_bundle_sources_agree() {
    let mut store = InMemoryStore::new(trading_days(70));
    for field in Field::ALL {
        store.fill(field, "A", |i| (i as f64 * 0.37).sin() * 4.0);
        store.fill(field, "B", |i| (i as f64 * 0.11).cos() * 2.0);
    }
    let bundle = full_bundle(&store);
    let symbols = store.list_symbols().unwrap();
    let date = store.calendar().date_at(60).unwrap();

    for offset in [0, -1, -5, -20] {
        let from_bundle = CalcArgs::with_bundle(&bundle, date).shifted(offset);
        let from_store = CalcArgs::with_store(&store, &symbols, date).shifted(offset);
        for factor in Factor::ALL {
            let a = factor.evaluate(&from_bundle).unwrap();
            let b = factor.evaluate(&from_store).unwrap();
            assert!(a.same_values(&b), "{factor} at {offset}");
        }
    }
}

#[test]
fn offsets_clamp_at_calendar_start() {
    let mut store = InMemoryStore::new(trading_days(3));
    store.fill(Field::AdjClosePrice, "A", |i| 100.0 + i as f64);
    let bundle = full_bundle(&store);
    let date = store.calendar().date_at(1).unwrap();
    let args = CalcArgs::with_bundle(&bundle, date).shifted(-20);
    assert_eq!(Factor::Close.evaluate(&args).unwrap().values(), &[100.0]);
}

#[test]
fn unknown_symbol_yields_nan_column() {
    let store = constant_store(45, 1.0, 1.0);
    let symbols = vec!["600000.SH".to_string(), "999999.SZ".to_string()];
    let bundle = DataBundle::fetch(&store, &symbols, store.calendar().days(), &Field::ALL).unwrap();
    let date = store.calendar().last().unwrap();
    let q = Factor::Q.evaluate(&CalcArgs::with_bundle(&bundle, date)).unwrap();
    assert_eq!(q.get(0), Some(3.0));
    assert!(q.get(1).unwrap().is_nan());
}

#[test]
fn invalid_field_name_fails_before_fetching() {
    let store = constant_store(5, 1.0, 1.0);
    let symbols = store.list_symbols().unwrap();
    let err = DataBundle::fetch_named(
        &store,
        &symbols,
        store.calendar().days(),
        &["scdq", "not_a_field"],
    )
    .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(store.fetch_count(), 0);
}
