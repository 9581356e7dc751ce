//! Request-scoped attribute cache.
//!
//! A `DataBundle` holds one `AttributeMatrix` per raw field, all sharing the
//! same trading-day rows and symbol columns. It is built once per request and
//! is read-only afterwards; worker threads receive their own slice via
//! [`DataBundle::select_symbols`]. Cells with no stored value are NaN.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::store::{AttributeRecord, AttributeStore};
use crate::calendar::TradingCalendar;
use crate::error::{CalcError, CalcResult};
use crate::field::Field;
use crate::series::Series;

/// Dates × symbols matrix of one raw field, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl AttributeMatrix {
    /// A matrix with every cell missing.
    pub fn missing(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![f64::NAN; rows * cols],
        }
    }

    /// Place records onto the calendar × symbol grid.
    ///
    /// Records whose date or symbol is outside the grid are dropped; later
    /// duplicates overwrite earlier ones.
    pub fn from_records(
        calendar: &TradingCalendar,
        symbols: &[String],
        records: &[AttributeRecord],
    ) -> Self {
        let mut matrix = Self::missing(calendar.len(), symbols.len());
        let columns: HashMap<&str, usize> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        for record in records {
            let (Ok(row), Some(&col)) = (
                calendar.index_of(record.date),
                columns.get(record.symbol.as_str()),
            ) else {
                continue;
            };
            matrix.values[row * matrix.cols + col] = record.value;
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.rows || col >= self.cols {
            return f64::NAN;
        }
        self.values[row * self.cols + col]
    }

    /// All symbol values at one trading-day row.
    pub fn row(&self, row: usize) -> &[f64] {
        if row >= self.rows {
            return &[];
        }
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// Rebuild with a new column order; `None` produces a missing column.
    fn select_columns(&self, columns: &[Option<usize>]) -> Self {
        let mut values = Vec::with_capacity(self.rows * columns.len());
        for row in 0..self.rows {
            for col in columns {
                values.push(col.map_or(f64::NAN, |c| self.get(row, c)));
            }
        }
        Self {
            rows: self.rows,
            cols: columns.len(),
            values,
        }
    }
}

/// Raw attribute matrices for one computation request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBundle {
    calendar: TradingCalendar,
    symbols: Vec<String>,
    matrices: BTreeMap<Field, AttributeMatrix>,
}

impl DataBundle {
    /// Assemble a bundle from fetched records. Symbols are sorted and
    /// deduplicated so that every series follows symbol order.
    pub fn assemble(
        calendar: TradingCalendar,
        symbols: &[String],
        fetched: Vec<(Field, Vec<AttributeRecord>)>,
    ) -> Self {
        let symbols = sorted_symbols(symbols);
        let matrices = fetched
            .into_iter()
            .map(|(field, records)| {
                (field, AttributeMatrix::from_records(&calendar, &symbols, &records))
            })
            .collect();
        Self {
            calendar,
            symbols,
            matrices,
        }
    }

    /// Fetch `fields` for `symbols` over `days`, one store call per field.
    pub fn fetch(
        store: &dyn AttributeStore,
        symbols: &[String],
        days: &[NaiveDate],
        fields: &[Field],
    ) -> CalcResult<Self> {
        let calendar = TradingCalendar::new(days.to_vec());
        let symbols = sorted_symbols(symbols);
        let mut fetched = Vec::with_capacity(fields.len());
        for &field in fields {
            let records = store.fetch_attribute(Some(&symbols), Some(calendar.days()), field)?;
            debug!(
                store = store.name(),
                field = field.as_str(),
                records = records.len(),
                "fetched attribute"
            );
            fetched.push((field, records));
        }
        Ok(Self::assemble(calendar, &symbols, fetched))
    }

    /// Like [`DataBundle::fetch`] but with field names; every name is
    /// validated before the first store call.
    pub fn fetch_named<S: AsRef<str>>(
        store: &dyn AttributeStore,
        symbols: &[String],
        days: &[NaiveDate],
        names: &[S],
    ) -> CalcResult<Self> {
        let fields = Field::parse_list(names)?;
        Self::fetch(store, symbols, days, &fields)
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn matrix(&self, field: Field) -> CalcResult<&AttributeMatrix> {
        self.matrices
            .get(&field)
            .ok_or(CalcError::FieldNotLoaded { field })
    }

    /// One field's values at a trading-day row, as a per-symbol series.
    pub fn series_at(&self, field: Field, row: usize) -> CalcResult<Series> {
        let matrix = self.matrix(field)?;
        if row >= matrix.rows() {
            return Ok(Series::missing(self.symbols.len()));
        }
        Ok(Series::new(matrix.row(row).to_vec()))
    }

    /// A bundle restricted to `symbols` (sorted); unknown symbols get
    /// missing columns.
    pub fn select_symbols(&self, symbols: &[String]) -> DataBundle {
        let symbols = sorted_symbols(symbols);
        let positions: HashMap<&str, usize> = self
            .symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let columns: Vec<Option<usize>> = symbols
            .iter()
            .map(|s| positions.get(s.as_str()).copied())
            .collect();
        let matrices = self
            .matrices
            .iter()
            .map(|(field, m)| (*field, m.select_columns(&columns)))
            .collect();
        DataBundle {
            calendar: self.calendar.clone(),
            symbols,
            matrices,
        }
    }

    /// BLAKE3 digest over dates, symbols, fields and cell bits.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for day in self.calendar.days() {
            hasher.update(day.to_string().as_bytes());
        }
        for symbol in &self.symbols {
            hasher.update(symbol.as_bytes());
            hasher.update(&[0]);
        }
        for (field, matrix) in &self.matrices {
            hasher.update(field.as_str().as_bytes());
            for v in &matrix.values {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn sorted_symbols(symbols: &[String]) -> Vec<String> {
    let mut symbols = symbols.to_vec();
    symbols.sort();
    symbols.dedup();
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn syms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn bundle() -> DataBundle {
        let calendar = TradingCalendar::new(vec![d(2), d(3)]);
        let records = vec![
            AttributeRecord::new(d(2), "B", 1.0),
            AttributeRecord::new(d(3), "A", 2.0),
            AttributeRecord::new(d(4), "A", 9.0),
            AttributeRecord::new(d(3), "Z", 9.0),
        ];
        DataBundle::assemble(calendar, &syms(&["B", "A", "B"]), vec![(Field::Scdq, records)])
    }

    #[test]
    fn assemble_sorts_symbols_and_drops_outside_records() {
        let b = bundle();
        assert_eq!(b.symbols(), &syms(&["A", "B"]));
        let m = b.matrix(Field::Scdq).unwrap();
        assert!(m.get(0, 0).is_nan());
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 0), 2.0);
        assert!(m.get(1, 1).is_nan());
    }

    #[test]
    fn unloaded_field_is_reported() {
        let err = bundle().matrix(Field::Tiq).unwrap_err();
        assert!(matches!(err, CalcError::FieldNotLoaded { field: Field::Tiq }));
    }

    #[test]
    fn select_symbols_slices_columns() {
        let slice = bundle().select_symbols(&syms(&["B", "C"]));
        assert_eq!(slice.symbols(), &syms(&["B", "C"]));
        let row = slice.series_at(Field::Scdq, 0).unwrap();
        assert_eq!(row.get(0), Some(1.0));
        assert!(row.get(1).unwrap().is_nan());
    }

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        let a = bundle();
        assert_eq!(a.fingerprint(), bundle().fingerprint());
        let b = a.select_symbols(&syms(&["A"]));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
