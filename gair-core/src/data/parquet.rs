//! Parquet-backed attribute store.
//!
//! Layout: `{dir}/field={name}.parquet` with columns `date`, `symbol`, `value`,
//! plus an optional `{dir}/names.json` mapping symbol to display name.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - The trading calendar is the distinct date set of `adj_close_price`
//! - The symbol universe is the distinct symbol set of `adj_close_price`

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::store::{AttributeRecord, AttributeStore, StoreError};
use crate::field::Field;

/// Field whose dates and symbols define the calendar and the universe.
const REFERENCE_FIELD: Field = Field::AdjClosePrice;

pub struct ParquetStore {
    dir: PathBuf,
}

impl ParquetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn field_path(&self, field: Field) -> PathBuf {
        self.dir.join(format!("field={}.parquet", field.as_str()))
    }

    fn names_path(&self) -> PathBuf {
        self.dir.join("names.json")
    }

    /// Fields that currently have a file in the store.
    pub fn available_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.field_path(*f).exists())
            .collect()
    }

    /// Replace the stored records of one field.
    pub fn write_field(&self, field: Field, records: &[AttributeRecord]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;

        let df = records_to_dataframe(records)?;
        let path = self.field_path(field);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;
        debug!(field = field.as_str(), rows = records.len(), "wrote field");
        Ok(())
    }

    /// Replace the symbol display-name map.
    pub fn write_names(&self, names: &BTreeMap<String, String>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;
        let json = serde_json::to_string_pretty(names)
            .map_err(|e| StoreError::Other(format!("names serialization: {e}")))?;
        fs::write(self.names_path(), json)
            .map_err(|e| StoreError::Io(format!("names write: {e}")))
    }

    fn load_field(&self, field: Field) -> Result<Vec<AttributeRecord>, StoreError> {
        self.scan_field(field, None, None)
    }

    /// Lazily scan one field, pushing the symbol set and the date span down
    /// into the Parquet read.
    fn scan_field(
        &self,
        field: Field,
        symbols: Option<&[String]>,
        span: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<AttributeRecord>, StoreError> {
        let path = self.field_path(field);
        if !path.exists() {
            return Err(StoreError::MissingField { field });
        }
        let mut lf = LazyFrame::scan_parquet(&path, Default::default())
            .map_err(|e| StoreError::Parquet(format!("scan {}: {e}", path.display())))?;
        if let Some(symbols) = symbols {
            let wanted = Series::new("symbols".into(), symbols.to_vec());
            lf = lf.filter(col("symbol").is_in(lit(wanted)));
        }
        if let Some((first, last)) = span {
            lf = lf.filter(col("date").gt_eq(lit(first)).and(col("date").lt_eq(lit(last))));
        }
        let df = lf
            .collect()
            .map_err(|e| StoreError::Parquet(format!("read {}: {e}", path.display())))?;
        dataframe_to_records(&df)
    }
}

impl AttributeStore for ParquetStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn list_trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let days: BTreeSet<NaiveDate> = self
            .load_field(REFERENCE_FIELD)?
            .into_iter()
            .map(|r| r.date)
            .filter(|d| start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e))
            .collect();
        Ok(days.into_iter().collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        let symbols: BTreeSet<String> = self
            .load_field(REFERENCE_FIELD)?
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        Ok(symbols.into_iter().collect())
    }

    fn symbol_names(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let path = self.names_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            fs::read_to_string(path).map_err(|e| StoreError::Io(format!("names read: {e}")))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Other(format!("names parse: {e}")))
    }

    fn fetch_attribute(
        &self,
        symbols: Option<&[String]>,
        trading_days: Option<&[NaiveDate]>,
        field: Field,
    ) -> Result<Vec<AttributeRecord>, StoreError> {
        let span = trading_days.and_then(|d| Some((*d.iter().min()?, *d.iter().max()?)));
        let mut records = self.scan_field(field, symbols, span)?;
        // the span is contiguous; requested days may not be
        if let Some(days) = trading_days {
            let days: HashSet<NaiveDate> = days.iter().copied().collect();
            records.retain(|r| days.contains(&r.date));
        }
        Ok(records)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn records_to_dataframe(records: &[AttributeRecord]) -> Result<DataFrame, StoreError> {
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let symbols: Vec<String> = records.iter().map(|r| r.symbol.clone()).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("symbol".into(), symbols),
        Column::new("value".into(), values),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Io(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<AttributeRecord>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("column read: {e}"));

    let dates = df.column("date").map_err(map_err)?;
    let symbols = df.column("symbol").map_err(map_err)?;
    let values = df.column("value").map_err(map_err)?;

    let date_ca = dates
        .date()
        .map_err(|e| StoreError::Parquet(format!("date column type: {e}")))?;
    let symbol_ca = symbols
        .str()
        .map_err(|e| StoreError::Parquet(format!("symbol column type: {e}")))?;
    let value_ca = values
        .f64()
        .map_err(|e| StoreError::Parquet(format!("value column type: {e}")))?;

    let epoch = epoch();
    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        let symbol = symbol_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null symbol at row {i}")))?;
        records.push(AttributeRecord {
            date: epoch + chrono::Duration::days(date_days as i64),
            symbol: symbol.to_string(),
            value: value_ca.get(i).unwrap_or(f64::NAN),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn closes() -> Vec<AttributeRecord> {
        vec![
            AttributeRecord::new(d(3), "600000.SH", 10.5),
            AttributeRecord::new(d(2), "600000.SH", 10.0),
            AttributeRecord::new(d(2), "000001.SZ", 12.0),
        ]
    }

    #[test]
    fn write_and_fetch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write_field(Field::AdjClosePrice, &closes()).unwrap();

        let only = vec!["600000.SH".to_string()];
        let mut records = store
            .fetch_attribute(Some(&only), None, Field::AdjClosePrice)
            .unwrap();
        records.sort_by_key(|r| r.date);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, 10.0);
        assert_eq!(records[1].date, d(3));
    }

    #[test]
    fn fetch_keeps_only_requested_days() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        let mut records = closes();
        records.push(AttributeRecord::new(d(4), "600000.SH", 11.0));
        records.push(AttributeRecord::new(d(5), "600000.SH", 11.5));
        store.write_field(Field::AdjClosePrice, &records).unwrap();

        let only = vec!["600000.SH".to_string()];
        let mut fetched = store
            .fetch_attribute(Some(&only), Some(&[d(4), d(2)]), Field::AdjClosePrice)
            .unwrap();
        fetched.sort_by_key(|r| r.date);
        let dates: Vec<_> = fetched.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2), d(4)]);
        assert!(fetched.iter().all(|r| r.symbol == "600000.SH"));
    }

    #[test]
    fn calendar_and_universe_come_from_close_prices() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write_field(Field::AdjClosePrice, &closes()).unwrap();

        assert_eq!(store.list_trading_days(None, None).unwrap(), vec![d(2), d(3)]);
        assert_eq!(store.list_symbols().unwrap(), vec!["000001.SZ", "600000.SH"]);
        assert_eq!(store.available_fields(), vec![Field::AdjClosePrice]);
    }

    #[test]
    fn missing_field_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(matches!(
            store.fetch_attribute(None, None, Field::Scdq),
            Err(StoreError::MissingField { field: Field::Scdq })
        ));
    }

    #[test]
    fn names_roundtrip_and_default_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(store.symbol_names().unwrap().is_empty());

        let mut names = BTreeMap::new();
        names.insert("600000.SH".to_string(), "PF Bank".to_string());
        store.write_names(&names).unwrap();
        assert_eq!(store.symbol_names().unwrap(), names);
    }
}
