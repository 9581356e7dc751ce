//! Slot, range and concurrent indicator computation.
//!
//! Three entry points:
//! - `compute_slot()`: every indicator for one date, one bundle.
//! - `compute_range()`: one bundle spanning the range's lookback, slots
//!   evaluated sequentially and stacked by date.
//! - `compute_slot_concurrent()`: the universe split into fixed-size
//!   fragments, one slot per fragment on a private worker pool, joined by
//!   symbol.
//!
//! Output ordering never depends on worker completion order: tables are
//! re-sorted by date and symbol before they are returned.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use gair_core::{
    evaluate_slot, AttributeStore, DataBundle, Field, IndicatorTable, TradingCalendar, MAX_LOOKBACK,
};

use crate::data_loader::{fetch_attributes, DEFAULT_FETCH_THREADS};
use crate::error::ComputeError;
use crate::export::{emit, OutputPlan};

/// Default number of symbols per concurrent fragment.
pub const DEFAULT_FRAGMENT_SIZE: usize = 200;

/// Tuning knobs for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeOptions {
    /// Symbols per concurrent fragment.
    pub fragment_size: usize,
    /// Worker threads for concurrent slots; `None` uses every available core.
    pub workers: Option<usize>,
    /// Concurrent field fetches when loading a bundle.
    pub fetch_threads: usize,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            workers: None,
            fetch_threads: DEFAULT_FETCH_THREADS,
        }
    }
}

impl ComputeOptions {
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// What to compute.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeRequest {
    Slot {
        symbols: Option<Vec<String>>,
        date: NaiveDate,
    },
    Range {
        symbols: Option<Vec<String>>,
        dates: Vec<NaiveDate>,
    },
    Concurrent {
        symbols: Option<Vec<String>>,
        date: NaiveDate,
    },
}

pub struct Orchestrator {
    store: Arc<dyn AttributeStore>,
    options: ComputeOptions,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn AttributeStore>, options: ComputeOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &dyn AttributeStore {
        self.store.as_ref()
    }

    pub fn options(&self) -> &ComputeOptions {
        &self.options
    }

    /// The store's full trading calendar.
    pub fn calendar(&self) -> Result<TradingCalendar, ComputeError> {
        Ok(TradingCalendar::new(self.store.list_trading_days(None, None)?))
    }

    /// Trading days within `[start, end]`.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, ComputeError> {
        Ok(self.store.list_trading_days(Some(start), Some(end))?)
    }

    /// Sorted, deduplicated symbols; the store universe when none are given.
    fn resolve_symbols(&self, symbols: Option<&[String]>) -> Result<Vec<String>, ComputeError> {
        let mut symbols = match symbols {
            Some(s) => s.to_vec(),
            None => self.store.list_symbols()?,
        };
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    /// Fetch every raw field for `symbols` from `MAX_LOOKBACK` rows before
    /// `first` through `last`.
    pub fn load_bundle(
        &self,
        symbols: &[String],
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<DataBundle, ComputeError> {
        let calendar = self.calendar()?;
        let days = calendar.span(first, last, MAX_LOOKBACK)?;
        fetch_attributes(
            self.store.as_ref(),
            symbols,
            days,
            &Field::ALL,
            self.options.fetch_threads,
        )
    }

    /// A supplied bundle restricted to the requested symbols, or `None` when
    /// it already matches.
    fn narrow(data: &DataBundle, symbols: Option<&[String]>) -> Option<DataBundle> {
        let symbols = symbols?;
        let mut wanted = symbols.to_vec();
        wanted.sort();
        wanted.dedup();
        (wanted.as_slice() != data.symbols()).then(|| data.select_symbols(&wanted))
    }

    /// Every indicator for one date, columns sorted by symbol.
    pub fn compute_slot(
        &self,
        symbols: Option<&[String]>,
        date: NaiveDate,
        data: Option<&DataBundle>,
    ) -> Result<IndicatorTable, ComputeError> {
        let start = Instant::now();
        let table = match data {
            Some(bundle) => match Self::narrow(bundle, symbols) {
                Some(narrowed) => evaluate_slot(&narrowed, date)?,
                None => evaluate_slot(bundle, date)?,
            },
            None => {
                let symbols = self.resolve_symbols(symbols)?;
                let bundle = self.load_bundle(&symbols, date, date)?;
                evaluate_slot(&bundle, date)?
            }
        };
        info!(
            %date,
            symbols = table.symbols().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "slot computed"
        );
        Ok(table)
    }

    /// Every indicator for each date, stacked and sorted by date.
    ///
    /// Dates are evaluated sequentially against one shared bundle; a failing
    /// date aborts the whole range.
    pub fn compute_range(
        &self,
        symbols: Option<&[String]>,
        dates: &[NaiveDate],
        data: Option<&DataBundle>,
    ) -> Result<IndicatorTable, ComputeError> {
        let mut dates = dates.to_vec();
        dates.sort();
        dates.dedup();
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return Err(ComputeError::EmptyRange);
        };

        let start = Instant::now();
        let loaded;
        let bundle = match data {
            Some(bundle) => match Self::narrow(bundle, symbols) {
                Some(narrowed) => {
                    loaded = narrowed;
                    &loaded
                }
                None => bundle,
            },
            None => {
                let symbols = self.resolve_symbols(symbols)?;
                loaded = self.load_bundle(&symbols, first, last)?;
                &loaded
            }
        };

        let mut slots = Vec::with_capacity(dates.len());
        for date in &dates {
            slots.push(evaluate_slot(bundle, *date)?);
            debug!(date = %date, "range slot done");
        }
        let table = IndicatorTable::concat_dates(slots)?;
        info!(
            %first,
            %last,
            dates = dates.len(),
            symbols = table.symbols().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "range computed"
        );
        Ok(table)
    }

    /// Every indicator for one date, symbols split into fragments evaluated
    /// concurrently. The result equals [`Orchestrator::compute_slot`] for any
    /// fragment size.
    pub fn compute_slot_concurrent(
        &self,
        symbols: Option<&[String]>,
        date: NaiveDate,
        data: Option<&DataBundle>,
    ) -> Result<IndicatorTable, ComputeError> {
        let start = Instant::now();
        let symbols = match (symbols, data) {
            (None, Some(bundle)) => bundle.symbols().to_vec(),
            (symbols, _) => self.resolve_symbols(symbols)?,
        };
        let fragment_size = self.options.fragment_size.max(1);
        let fragments: Vec<&[String]> = symbols.chunks(fragment_size).collect();

        // workers without a supplied bundle fetch their own over this window
        let window = match data {
            Some(_) => Vec::new(),
            None => self.calendar()?.span(date, date, MAX_LOOKBACK)?.to_vec(),
        };

        let workers = self.options.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;

        let store = self.store.as_ref();
        let parts: Vec<IndicatorTable> = pool.install(|| {
            fragments
                .par_iter()
                .enumerate()
                .map(|(fragment, chunk)| {
                    let result = match data {
                        Some(bundle) => evaluate_slot(&bundle.select_symbols(chunk), date),
                        None => DataBundle::fetch(store, chunk, &window, &Field::ALL)
                            .and_then(|bundle| evaluate_slot(&bundle, date)),
                    };
                    debug!(fragment, symbols = chunk.len(), ok = result.is_ok(), "fragment done");
                    result.map_err(|source| ComputeError::Worker { fragment, source })
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        let table = if parts.is_empty() {
            // empty universe: an evaluated slot with no columns
            match data {
                Some(bundle) => evaluate_slot(&bundle.select_symbols(&[]), date)?,
                None => {
                    let bundle = DataBundle::fetch(store, &[], &window, &Field::ALL)?;
                    evaluate_slot(&bundle, date)?
                }
            }
        } else {
            IndicatorTable::concat_symbols(parts)?
        };
        info!(
            %date,
            symbols = table.symbols().len(),
            fragments = fragments.len(),
            workers,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "concurrent slot computed"
        );
        Ok(table)
    }

    /// Compute `request` against the store.
    pub fn compute(&self, request: &ComputeRequest) -> Result<IndicatorTable, ComputeError> {
        match request {
            ComputeRequest::Slot { symbols, date } => {
                self.compute_slot(symbols.as_deref(), *date, None)
            }
            ComputeRequest::Range { symbols, dates } => {
                self.compute_range(symbols.as_deref(), dates, None)
            }
            ComputeRequest::Concurrent { symbols, date } => {
                self.compute_slot_concurrent(symbols.as_deref(), *date, None)
            }
        }
    }

    /// Compute `request`, then write the finished table to every output in
    /// `plan`. Nothing is written when the computation fails.
    pub fn run(
        &self,
        request: &ComputeRequest,
        plan: &OutputPlan,
    ) -> anyhow::Result<(IndicatorTable, Vec<PathBuf>)> {
        let table = self.compute(request)?;
        if plan.is_empty() {
            return Ok((table, Vec::new()));
        }
        let names = self.store.symbol_names()?;
        let written = emit(&table, plan, &names)?;
        Ok((table, written))
    }
}
