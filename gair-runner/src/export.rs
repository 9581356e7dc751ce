//! Output stage: CSV layouts, JSON document and row sinks.
//!
//! Consumes a finished `IndicatorTable`; nothing here runs while indicators
//! are being computed.
//! - **CSV**: combined long format, or one file per symbol, date or indicator
//! - **JSON**: dates, symbols and per-indicator matrices (`null` = missing)
//! - **Rows**: `(date, symbol, name, value)` upserts keyed by date and symbol
//!
//! Missing values are empty CSV cells, JSON `null`, and skipped sink rows.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gair_core::{Indicator, IndicatorTable};

// ─── CSV export ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
    /// `indicators.csv` with columns indicator, date, symbol, value.
    #[default]
    Combined,
    /// `<symbol>.csv`: indicators × dates.
    Symbol,
    /// `<date>.csv`: indicators × symbols.
    Date,
    /// `<indicator>.csv`: dates × symbols.
    Indicator,
}

impl CsvLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsvLayout::Combined => "combined",
            CsvLayout::Symbol => "symbol",
            CsvLayout::Date => "date",
            CsvLayout::Indicator => "indicator",
        }
    }
}

impl fmt::Display for CsvLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CsvLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "combined" => Ok(CsvLayout::Combined),
            "symbol" => Ok(CsvLayout::Symbol),
            "date" => Ok(CsvLayout::Date),
            "indicator" => Ok(CsvLayout::Indicator),
            other => anyhow::bail!(
                "unknown CSV layout '{other}' (expected combined, symbol, date or indicator)"
            ),
        }
    }
}

fn cell(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Long format: one row per (indicator, date, symbol).
pub fn export_combined_csv(table: &IndicatorTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["indicator", "date", "symbol", "value"])?;
    for &indicator in table.indicators() {
        for &date in table.dates() {
            let Some(row) = table.row(indicator, date) else { continue };
            let day = date.to_string();
            for (symbol, v) in table.symbols().iter().zip(row) {
                let value = cell(*v);
                wtr.write_record([indicator.name(), day.as_str(), symbol.as_str(), value.as_str()])?;
            }
        }
    }
    finish(wtr)
}

/// Indicators × dates for one symbol.
pub fn export_symbol_csv(table: &IndicatorTable, symbol: &str) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["indicator".to_string()];
    header.extend(table.dates().iter().map(|d| d.to_string()));
    wtr.write_record(&header)?;
    for &indicator in table.indicators() {
        let column = table
            .column(indicator, symbol)
            .with_context(|| format!("symbol {symbol} not in table"))?;
        let mut record = vec![indicator.name().to_string()];
        record.extend(column.into_iter().map(cell));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Indicators × symbols for one date.
pub fn export_date_csv(table: &IndicatorTable, date: NaiveDate) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["indicator".to_string()];
    header.extend(table.symbols().iter().cloned());
    wtr.write_record(&header)?;
    for &indicator in table.indicators() {
        let row = table
            .row(indicator, date)
            .with_context(|| format!("date {date} not in table"))?;
        let mut record = vec![indicator.name().to_string()];
        record.extend(row.iter().map(|v| cell(*v)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Dates × symbols for one indicator.
pub fn export_indicator_csv(table: &IndicatorTable, indicator: Indicator) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date".to_string()];
    header.extend(table.symbols().iter().cloned());
    wtr.write_record(&header)?;
    for &date in table.dates() {
        let row = table
            .row(indicator, date)
            .with_context(|| format!("indicator {indicator} not in table"))?;
        let mut record = vec![date.to_string()];
        record.extend(row.iter().map(|v| cell(*v)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Write the table under `dir` in `layout`; returns the files written.
pub fn write_csv(table: &IndicatorTable, dir: &Path, layout: CsvLayout) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let files: Vec<(String, String)> = match layout {
        CsvLayout::Combined => vec![("indicators.csv".into(), export_combined_csv(table)?)],
        CsvLayout::Symbol => table
            .symbols()
            .iter()
            .map(|s| Ok((format!("{s}.csv"), export_symbol_csv(table, s)?)))
            .collect::<Result<_>>()?,
        CsvLayout::Date => table
            .dates()
            .iter()
            .map(|d| Ok((format!("{d}.csv"), export_date_csv(table, *d)?)))
            .collect::<Result<_>>()?,
        CsvLayout::Indicator => table
            .indicators()
            .iter()
            .map(|i| Ok((format!("{}.csv", i.table_name()), export_indicator_csv(table, *i)?)))
            .collect::<Result<_>>()?,
    };

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    info!(layout = %layout, files = written.len(), dir = %dir.display(), "csv written");
    Ok(written)
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serializable view of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    /// Indicator name → rows (dates) of per-symbol values.
    pub indicators: BTreeMap<String, Vec<Vec<Option<f64>>>>,
}

impl TableDocument {
    pub fn from_table(table: &IndicatorTable) -> Self {
        let indicators = table
            .indicators()
            .iter()
            .map(|&indicator| {
                let rows = table
                    .dates()
                    .iter()
                    .map(|&date| {
                        table
                            .row(indicator, date)
                            .unwrap_or_default()
                            .iter()
                            .map(|v| (!v.is_nan()).then_some(*v))
                            .collect()
                    })
                    .collect();
                (indicator.name().to_string(), rows)
            })
            .collect();
        Self {
            dates: table.dates().to_vec(),
            symbols: table.symbols().to_vec(),
            indicators,
        }
    }
}

pub fn export_json(table: &IndicatorTable) -> Result<String> {
    serde_json::to_string_pretty(&TableDocument::from_table(table))
        .context("failed to serialize indicator table to JSON")
}

// ─── Row sinks ──────────────────────────────────────────────────────

/// One persisted indicator value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRow {
    /// `YYYY-MM-DD 00:00:00`
    pub date: String,
    pub symbol: String,
    pub name: String,
    pub value: f64,
}

/// Destination for per-indicator rows, upserted by `(date, symbol)`.
pub trait RowSink {
    /// Insert or replace `rows` in `table`; returns the rows written.
    fn upsert(&mut self, table: &str, rows: &[SinkRow]) -> Result<usize>;
}

/// Rows of one indicator; missing values are skipped. Symbols without a
/// display name use their code.
pub fn sink_rows(
    table: &IndicatorTable,
    indicator: Indicator,
    names: &BTreeMap<String, String>,
) -> Vec<SinkRow> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for &date in table.dates() {
        let Some(values) = table.row(indicator, date) else { continue };
        for (symbol, v) in table.symbols().iter().zip(values) {
            if v.is_nan() {
                skipped += 1;
                continue;
            }
            rows.push(SinkRow {
                date: format!("{} 00:00:00", date.format("%Y-%m-%d")),
                symbol: symbol.clone(),
                name: names.get(symbol).cloned().unwrap_or_else(|| symbol.clone()),
                value: *v,
            });
        }
    }
    if skipped > 0 {
        warn!(indicator = %indicator, skipped, "missing values not persisted");
    }
    rows
}

/// Upsert every indicator of `table` into `sink`; returns the rows written.
pub fn persist(
    table: &IndicatorTable,
    sink: &mut dyn RowSink,
    names: &BTreeMap<String, String>,
) -> Result<usize> {
    let mut total = 0;
    for &indicator in table.indicators() {
        let rows = sink_rows(table, indicator, names);
        total += sink.upsert(&indicator.table_name(), &rows)?;
    }
    Ok(total)
}

/// JSON-lines files, one per indicator table: `<dir>/<table>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    /// Current rows of `table`, ordered by date then symbol.
    pub fn load(&self, table: &str) -> Result<Vec<SinkRow>> {
        let path = self.path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("malformed sink row"))
            .collect()
    }
}

impl RowSink for JsonlSink {
    fn upsert(&mut self, table: &str, rows: &[SinkRow]) -> Result<usize> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create sink dir: {}", self.dir.display()))?;

        let mut merged: BTreeMap<(String, String), SinkRow> = self
            .load(table)?
            .into_iter()
            .map(|r| ((r.date.clone(), r.symbol.clone()), r))
            .collect();
        for row in rows {
            merged.insert((row.date.clone(), row.symbol.clone()), row.clone());
        }

        let mut out = String::new();
        for row in merged.values() {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        let path = self.path(table);
        let tmp = path.with_extension("jsonl.tmp");
        fs::write(&tmp, out).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(rows.len())
    }
}

// ─── Output plan ────────────────────────────────────────────────────

/// Which outputs to produce after a computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputPlan {
    pub csv_dir: Option<PathBuf>,
    pub layout: CsvLayout,
    pub json: Option<PathBuf>,
    pub sink_dir: Option<PathBuf>,
}

impl OutputPlan {
    pub fn is_empty(&self) -> bool {
        self.csv_dir.is_none() && self.json.is_none() && self.sink_dir.is_none()
    }
}

/// Produce every output in `plan`; returns the files written.
pub fn emit(
    table: &IndicatorTable,
    plan: &OutputPlan,
    names: &BTreeMap<String, String>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let Some(dir) = &plan.csv_dir {
        written.extend(write_csv(table, dir, plan.layout)?);
    }
    if let Some(path) = &plan.json {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, export_json(table)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path.clone());
    }
    if let Some(dir) = &plan.sink_dir {
        let mut sink = JsonlSink::new(dir);
        let rows = persist(table, &mut sink, names)?;
        info!(rows, dir = %dir.display(), "rows persisted");
        written.extend(table.indicators().iter().map(|i| sink.path(&i.table_name())));
    }
    Ok(written)
}
