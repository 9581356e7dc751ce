//! In-memory attribute store for tests, benches and demos.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::store::{AttributeRecord, AttributeStore, StoreError};
use crate::calendar::TradingCalendar;
use crate::field::Field;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    calendar: TradingCalendar,
    symbols: BTreeSet<String>,
    names: BTreeMap<String, String>,
    cells: HashMap<Field, BTreeMap<(NaiveDate, String), f64>>,
    fetches: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(trading_days: Vec<NaiveDate>) -> Self {
        Self {
            calendar: TradingCalendar::new(trading_days),
            ..Self::default()
        }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Set one cell. The symbol joins the universe.
    pub fn insert(&mut self, field: Field, date: NaiveDate, symbol: &str, value: f64) {
        self.symbols.insert(symbol.to_string());
        self.cells
            .entry(field)
            .or_default()
            .insert((date, symbol.to_string()), value);
    }

    /// Fill one field for one symbol on every trading day; `value` receives
    /// the row index.
    pub fn fill(&mut self, field: Field, symbol: &str, value: impl Fn(usize) -> f64) {
        let days = self.calendar.days().to_vec();
        for (i, day) in days.into_iter().enumerate() {
            self.insert(field, day, symbol, value(i));
        }
    }

    /// Fill every recognized field for one symbol with a constant.
    pub fn fill_all(&mut self, symbol: &str, value: f64) {
        for field in Field::ALL {
            self.fill(field, symbol, |_| value);
        }
    }

    /// Remove one cell, leaving it missing.
    pub fn remove(&mut self, field: Field, date: NaiveDate, symbol: &str) {
        if let Some(cells) = self.cells.get_mut(&field) {
            cells.remove(&(date, symbol.to_string()));
        }
    }

    pub fn set_name(&mut self, symbol: &str, name: &str) {
        self.names.insert(symbol.to_string(), name.to_string());
    }

    /// Number of `fetch_attribute` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl AttributeStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(self.calendar.between(start, end).to_vec())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.symbols.iter().cloned().collect())
    }

    fn symbol_names(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.names.clone())
    }

    fn fetch_attribute(
        &self,
        symbols: Option<&[String]>,
        trading_days: Option<&[NaiveDate]>,
        field: Field,
    ) -> Result<Vec<AttributeRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let Some(cells) = self.cells.get(&field) else {
            return Ok(Vec::new());
        };
        let symbols: Option<HashSet<&str>> =
            symbols.map(|s| s.iter().map(|s| s.as_str()).collect());
        let days: Option<HashSet<NaiveDate>> = trading_days.map(|d| d.iter().copied().collect());
        Ok(cells
            .iter()
            .filter(|((date, symbol), _)| {
                symbols.as_ref().map_or(true, |s| s.contains(symbol.as_str()))
                    && days.as_ref().map_or(true, |d| d.contains(date))
            })
            .map(|((date, symbol), value)| AttributeRecord::new(*date, symbol.clone(), *value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_filters_by_symbol_and_day() {
        let mut store = InMemoryStore::new(vec![d(2), d(3), d(4)]);
        store.fill(Field::Tiq, "A", |i| i as f64);
        store.fill(Field::Tiq, "B", |i| 10.0 + i as f64);

        let only_a = vec!["A".to_string()];
        let records = store
            .fetch_attribute(Some(&only_a), Some(&[d(3)]), Field::Tiq)
            .unwrap();
        assert_eq!(records, vec![AttributeRecord::new(d(3), "A", 1.0)]);
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn lists_days_and_symbols() {
        let mut store = InMemoryStore::new(vec![d(4), d(2), d(3)]);
        store.fill_all("B", 1.0);
        store.fill_all("A", 1.0);
        assert_eq!(store.list_trading_days(Some(d(3)), None).unwrap(), vec![d(3), d(4)]);
        assert_eq!(store.list_symbols().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn unknown_field_yields_no_records() {
        let store = InMemoryStore::new(vec![d(2)]);
        assert!(store.fetch_attribute(None, None, Field::Cadd).unwrap().is_empty());
    }
}
