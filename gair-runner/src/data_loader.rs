//! Attribute loading for the orchestrator.
//!
//! Fetches raw fields from an `AttributeStore` and assembles a `DataBundle`.
//! Fields are independent, so they are fetched concurrently on a private
//! pool bounded by `fetch_threads`. Symbol-fragment workers never call into
//! this pool; they fetch sequentially with `DataBundle::fetch`.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use gair_core::{
    AttributeRecord, AttributeStore, DataBundle, Field, ParquetStore, StoreError, TradingCalendar,
};

use crate::error::ComputeError;

/// Default number of concurrent field fetches.
pub const DEFAULT_FETCH_THREADS: usize = 5;

/// Fetch `fields` for `symbols` over `days` with up to `threads` concurrent
/// store calls, one per field.
pub fn fetch_attributes(
    store: &dyn AttributeStore,
    symbols: &[String],
    days: &[NaiveDate],
    fields: &[Field],
    threads: usize,
) -> Result<DataBundle, ComputeError> {
    let start = Instant::now();
    let calendar = TradingCalendar::new(days.to_vec());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;

    let fetched: Vec<(Field, Vec<AttributeRecord>)> = pool.install(|| {
        fields
            .par_iter()
            .map(|&field| {
                let records =
                    store.fetch_attribute(Some(symbols), Some(calendar.days()), field)?;
                debug!(field = field.as_str(), records = records.len(), "fetched attribute");
                Ok((field, records))
            })
            .collect::<Result<Vec<_>, StoreError>>()
    })?;

    let bundle = DataBundle::assemble(calendar, symbols, fetched);
    info!(
        store = store.name(),
        fields = fields.len(),
        symbols = bundle.symbols().len(),
        days = bundle.calendar().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "bundle loaded"
    );
    Ok(bundle)
}

/// Like [`fetch_attributes`] with field names; unknown names fail before any
/// store call.
pub fn fetch_attributes_named<S: AsRef<str>>(
    store: &dyn AttributeStore,
    symbols: &[String],
    days: &[NaiveDate],
    names: &[S],
    threads: usize,
) -> Result<DataBundle, ComputeError> {
    let fields = Field::parse_list(names)?;
    fetch_attributes(store, symbols, days, &fields, threads)
}

/// Copy every field and the symbol names from `source` into a Parquet store.
///
/// Returns the number of records written.
pub fn materialize(source: &dyn AttributeStore, target: &ParquetStore) -> Result<usize, StoreError> {
    let mut written = 0;
    for field in Field::ALL {
        let records = source.fetch_attribute(None, None, field)?;
        target.write_field(field, &records)?;
        written += records.len();
    }
    target.write_names(&source.symbol_names()?)?;
    info!(
        source = source.name(),
        dir = %target.dir().display(),
        records = written,
        "store materialized"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gair_core::InMemoryStore;

    fn store() -> InMemoryStore {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let days = (0..10).map(|i| start + chrono::Duration::days(i)).collect();
        let mut store = InMemoryStore::new(days);
        store.fill_all("A", 1.0);
        store.fill_all("B", 2.0);
        store
    }

    #[test]
    fn parallel_fetch_matches_sequential() {
        let store = store();
        let symbols = vec!["B".to_string(), "A".to_string()];
        let days = store.calendar().days();
        let parallel = fetch_attributes(&store, &symbols, days, &Field::ALL, 4).unwrap();
        let sequential = DataBundle::fetch(&store, &symbols, days, &Field::ALL).unwrap();
        assert_eq!(parallel.fingerprint(), sequential.fingerprint());
        assert_eq!(store.fetch_count(), 2 * Field::ALL.len());
    }

    #[test]
    fn unknown_name_fails_before_fetch() {
        let store = store();
        let err = fetch_attributes_named(&store, &[], store.calendar().days(), &["tiq", "bogus"], 2)
            .unwrap_err();
        assert!(matches!(err, ComputeError::Calc(e) if e.is_configuration()));
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn materialize_roundtrips_through_parquet() {
        let store = store();
        let dir = tempfile::tempdir().unwrap();
        let target = ParquetStore::new(dir.path());
        let written = materialize(&store, &target).unwrap();
        assert_eq!(written, 2 * 10 * Field::ALL.len());
        assert_eq!(target.list_trading_days(None, None).unwrap(), store.calendar().days());
        assert_eq!(target.list_symbols().unwrap(), vec!["A", "B"]);
    }
}
