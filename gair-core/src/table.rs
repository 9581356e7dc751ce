//! Indicator tables: one dates × symbols frame per indicator.
//!
//! A slot produces a single-date table; ranges are built by stacking slots
//! along dates and fragments are joined along symbols. Dates and symbols
//! are kept ascending after every combine.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::error::{CalcError, CalcResult};
use crate::indicator::Indicator;
use crate::series::Series;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    indicators: Vec<Indicator>,
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    /// `frames[i]` is row-major dates × symbols for `indicators[i]`.
    frames: Vec<Vec<f64>>,
}

impl IndicatorTable {
    /// A one-date table from per-indicator series in `symbols` order.
    pub fn from_slot(
        date: NaiveDate,
        symbols: Vec<String>,
        columns: Vec<(Indicator, Series)>,
    ) -> CalcResult<Self> {
        let mut seen = HashSet::new();
        let mut indicators = Vec::with_capacity(columns.len());
        let mut frames = Vec::with_capacity(columns.len());
        for (indicator, series) in columns {
            if !seen.insert(indicator) {
                return Err(CalcError::TableShape(format!("duplicate indicator {indicator}")));
            }
            series.ensure_len(symbols.len())?;
            indicators.push(indicator);
            frames.push(series.into_values());
        }
        let mut table = Self {
            indicators,
            dates: vec![date],
            symbols,
            frames,
        };
        table.sort_symbols()?;
        Ok(table)
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// (indicators, dates, symbols)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.indicators.len(), self.dates.len(), self.symbols.len())
    }

    fn position(&self, indicator: Indicator) -> Option<usize> {
        self.indicators.iter().position(|i| *i == indicator)
    }

    /// Row-major dates × symbols values of one indicator.
    pub fn frame(&self, indicator: Indicator) -> Option<&[f64]> {
        self.position(indicator).map(|i| self.frames[i].as_slice())
    }

    /// One indicator's values on one date, in symbol order.
    pub fn row(&self, indicator: Indicator, date: NaiveDate) -> Option<&[f64]> {
        let frame = self.frame(indicator)?;
        let r = self.dates.iter().position(|d| *d == date)?;
        let cols = self.symbols.len();
        Some(&frame[r * cols..(r + 1) * cols])
    }

    pub fn series(&self, indicator: Indicator, date: NaiveDate) -> Option<Series> {
        self.row(indicator, date).map(|r| Series::new(r.to_vec()))
    }

    pub fn value(&self, indicator: Indicator, date: NaiveDate, symbol: &str) -> Option<f64> {
        let c = self.symbols.iter().position(|s| s == symbol)?;
        self.row(indicator, date).map(|r| r[c])
    }

    /// One indicator for one symbol across all dates.
    pub fn column(&self, indicator: Indicator, symbol: &str) -> Option<Vec<f64>> {
        let frame = self.frame(indicator)?;
        let c = self.symbols.iter().position(|s| s == symbol)?;
        let cols = self.symbols.len();
        Some((0..self.dates.len()).map(|r| frame[r * cols + c]).collect())
    }

    /// Cell-wise equality where NaN equals NaN.
    pub fn same_values(&self, other: &IndicatorTable) -> bool {
        self.indicators == other.indicators
            && self.dates == other.dates
            && self.symbols == other.symbols
            && self.frames.iter().zip(&other.frames).all(|(a, b)| {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()))
            })
    }

    /// Stack tables sharing indicators and symbols along the date axis.
    pub fn concat_dates(parts: Vec<IndicatorTable>) -> CalcResult<IndicatorTable> {
        let mut parts = parts.into_iter();
        let mut out = parts.next().ok_or(CalcError::EmptyTable)?;
        let mut seen: HashSet<NaiveDate> = out.dates.iter().copied().collect();
        for part in parts {
            if part.indicators != out.indicators || part.symbols != out.symbols {
                return Err(CalcError::TableShape(
                    "date concatenation needs identical indicators and symbols".into(),
                ));
            }
            for date in &part.dates {
                if !seen.insert(*date) {
                    return Err(CalcError::TableShape(format!("duplicate date {date}")));
                }
            }
            out.dates.extend(part.dates);
            for (frame, extra) in out.frames.iter_mut().zip(part.frames) {
                frame.extend(extra);
            }
        }
        out.sort_dates();
        Ok(out)
    }

    /// Join tables sharing indicators and dates along the symbol axis.
    pub fn concat_symbols(parts: Vec<IndicatorTable>) -> CalcResult<IndicatorTable> {
        let first = parts.first().ok_or(CalcError::EmptyTable)?;
        let indicators = first.indicators.clone();
        let dates = first.dates.clone();

        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        for part in &parts {
            if part.indicators != indicators || part.dates != dates {
                return Err(CalcError::TableShape(
                    "symbol concatenation needs identical indicators and dates".into(),
                ));
            }
            for symbol in &part.symbols {
                if !seen.insert(symbol.as_str()) {
                    return Err(CalcError::TableShape(format!("duplicate symbol {symbol}")));
                }
                symbols.push(symbol.clone());
            }
        }

        let frames = (0..indicators.len())
            .map(|i| {
                let mut frame = Vec::with_capacity(dates.len() * symbols.len());
                for r in 0..dates.len() {
                    for part in &parts {
                        let cols = part.symbols.len();
                        frame.extend_from_slice(&part.frames[i][r * cols..(r + 1) * cols]);
                    }
                }
                frame
            })
            .collect();

        let mut out = IndicatorTable {
            indicators,
            dates,
            symbols,
            frames,
        };
        out.sort_symbols()?;
        Ok(out)
    }

    fn sort_dates(&mut self) {
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&r| self.dates[r]);
        if order.iter().enumerate().all(|(i, &r)| i == r) {
            return;
        }
        let cols = self.symbols.len();
        for frame in &mut self.frames {
            let mut sorted = Vec::with_capacity(frame.len());
            for &r in &order {
                sorted.extend_from_slice(&frame[r * cols..(r + 1) * cols]);
            }
            *frame = sorted;
        }
        self.dates = order.iter().map(|&r| self.dates[r]).collect();
    }

    fn sort_symbols(&mut self) -> CalcResult<()> {
        let mut order: Vec<usize> = (0..self.symbols.len()).collect();
        order.sort_by(|&a, &b| self.symbols[a].cmp(&self.symbols[b]));
        if order.windows(2).any(|w| self.symbols[w[0]] == self.symbols[w[1]]) {
            return Err(CalcError::TableShape("duplicate symbol in table".into()));
        }
        if order.iter().enumerate().all(|(i, &c)| i == c) {
            return Ok(());
        }
        let cols = self.symbols.len();
        for frame in &mut self.frames {
            let mut sorted = Vec::with_capacity(frame.len());
            for row in frame.chunks(cols) {
                sorted.extend(order.iter().map(|&c| row[c]));
            }
            *frame = sorted;
        }
        self.symbols = order.iter().map(|&c| self.symbols[c].clone()).collect();
        Ok(())
    }
}
