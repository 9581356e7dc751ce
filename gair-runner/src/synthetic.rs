//! Deterministic synthetic attribute store.
//!
//! Produces plausible raw attributes for demos, benches and the `generate`
//! command. Every (symbol, field) series is seeded from a BLAKE3 hash of its
//! name, so repeated runs and partial fetches see identical values. About
//! one cell in a hundred is left missing so that NaN handling is exercised.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};

use gair_core::{AttributeRecord, AttributeStore, Field, StoreError, TradingCalendar};

const MISSING_RATE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct SyntheticStore {
    calendar: TradingCalendar,
    symbols: Vec<String>,
}

impl SyntheticStore {
    /// Weekday calendar over `[start, end]` for `symbols` (sorted, deduplicated).
    pub fn new(symbols: &[String], start: NaiveDate, end: NaiveDate) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort();
        symbols.dedup();
        Self {
            calendar: TradingCalendar::new(weekdays(start, end)),
            symbols,
        }
    }

    /// `count` symbols named like exchange codes: `000001.SZ`, `000002.SZ`, ...
    pub fn with_universe(count: usize, start: NaiveDate, end: NaiveDate) -> Self {
        let symbols: Vec<String> = (1..=count).map(|i| format!("{i:06}.SZ")).collect();
        Self::new(&symbols, start, end)
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// The full series of one field for one symbol; `None` marks a missing cell.
    fn series(&self, symbol: &str, field: Field) -> Vec<Option<f64>> {
        let seed = blake3::hash(format!("{symbol}/{}", field.as_str()).as_bytes());
        let mut rng = StdRng::from_seed(*seed.as_bytes());

        let mut out = Vec::with_capacity(self.calendar.len());
        if field == Field::AdjClosePrice {
            let mut price = 100.0_f64;
            for _ in 0..self.calendar.len() {
                price *= 1.0 + rng.gen_range(-0.03..0.03);
                out.push(Some(price));
            }
            return out;
        }

        // mean-reverting walk kept roughly within [-3, 3]
        let mut level: f64 = rng.gen_range(-1.0..1.0);
        for _ in 0..self.calendar.len() {
            level = 0.9 * level + rng.gen_range(-0.6..0.6);
            if rng.gen_bool(MISSING_RATE) {
                out.push(None);
            } else {
                out.push(Some((level * 100.0).round() / 100.0));
            }
        }
        out
    }
}

impl AttributeStore for SyntheticStore {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn list_trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(self.calendar.between(start, end).to_vec())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.symbols.clone())
    }

    fn symbol_names(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .symbols
            .iter()
            .map(|s| (s.clone(), format!("Synthetic {s}")))
            .collect())
    }

    fn fetch_attribute(
        &self,
        symbols: Option<&[String]>,
        trading_days: Option<&[NaiveDate]>,
        field: Field,
    ) -> Result<Vec<AttributeRecord>, StoreError> {
        let wanted: Option<HashSet<&str>> =
            symbols.map(|s| s.iter().map(|s| s.as_str()).collect());
        let days: Option<HashSet<NaiveDate>> = trading_days.map(|d| d.iter().copied().collect());

        let mut records = Vec::new();
        for symbol in &self.symbols {
            if wanted.as_ref().is_some_and(|w| !w.contains(symbol.as_str())) {
                continue;
            }
            let series = self.series(symbol, field);
            for (date, value) in self.calendar.days().iter().zip(series) {
                let Some(value) = value else { continue };
                if days.as_ref().map_or(true, |d| d.contains(date)) {
                    records.push(AttributeRecord::new(*date, symbol.clone(), value));
                }
            }
        }
        Ok(records)
    }
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}
