//! GAIR CLI: compute indicator slots and ranges, generate synthetic stores.
//!
//! Commands:
//! - `slot`: every indicator for one date (optionally fragment-parallel)
//! - `range`: every indicator for each trading day in a date range
//! - `generate`: write a synthetic attribute store as Parquet
//! - `fields`: list raw fields and indicators, or describe one indicator

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gair_core::{Field, Indicator, IndicatorTable, ParquetStore, MAX_LOOKBACK};
use gair_runner::{
    materialize, ComputeRequest, CsvLayout, GairConfig, Orchestrator, StoreKind, SyntheticStore,
};

#[derive(Parser)]
#[command(name = "gair", about = "GAIR: factor and signal indicators for equity universes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every indicator for one trading day.
    Slot {
        /// Target date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Split the universe into fragments evaluated on a worker pool.
        #[arg(long, default_value_t = false)]
        concurrent: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Compute every indicator for each trading day in [start, end].
    Range {
        /// First date (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last date (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Write a deterministic synthetic attribute store as Parquet.
    Generate {
        /// Output directory.
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Number of generated symbols (ignored when --symbols is given).
        #[arg(long, default_value_t = 20)]
        universe: usize,

        /// Explicit symbols, comma separated.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// First calendar day (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-02")]
        start: NaiveDate,

        /// Last calendar day (YYYY-MM-DD).
        #[arg(long, default_value = "2023-12-29")]
        end: NaiveDate,
    },
    /// List raw attribute fields and output indicators.
    Fields {
        /// Describe one indicator (`M2L(n)`, `M2L` or `m2l`).
        indicator: Option<Indicator>,

        /// Mark the raw fields present in this Parquet store directory.
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
}

/// Store, compute and output flags shared by `slot` and `range`.
/// Flags override values from `--config`.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols, comma separated. Defaults to the store universe.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Parquet store directory.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Use the synthetic store instead of Parquet.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Symbols per concurrent fragment.
    #[arg(long)]
    fragment_size: Option<usize>,

    /// Worker threads for concurrent slots.
    #[arg(long)]
    workers: Option<usize>,

    /// Concurrent field fetches.
    #[arg(long)]
    fetch_threads: Option<usize>,

    /// Directory for CSV output.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// CSV layout: combined, symbol, date or indicator.
    #[arg(long)]
    layout: Option<CsvLayout>,

    /// Path for the JSON document.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Directory for JSON-lines indicator tables.
    #[arg(long)]
    sink_dir: Option<PathBuf>,
}

impl RunArgs {
    fn resolve_config(&self) -> Result<GairConfig> {
        let mut config = match &self.config {
            Some(path) => GairConfig::load(path)?,
            None => GairConfig::default(),
        };
        if let Some(dir) = &self.store_dir {
            config.store.dir = dir.clone();
        }
        if self.synthetic {
            config.store.kind = StoreKind::Synthetic;
        }
        if let Some(n) = self.fragment_size {
            config.compute.fragment_size = n;
        }
        if self.workers.is_some() {
            config.compute.workers = self.workers;
        }
        if let Some(n) = self.fetch_threads {
            config.compute.fetch_threads = n;
        }
        if self.csv_dir.is_some() {
            config.output.csv_dir = self.csv_dir.clone();
        }
        if let Some(layout) = self.layout {
            config.output.layout = layout;
        }
        if self.json.is_some() {
            config.output.json = self.json.clone();
        }
        if self.sink_dir.is_some() {
            config.output.sink_dir = self.sink_dir.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn symbols(&self) -> Option<Vec<String>> {
        (!self.symbols.is_empty()).then(|| self.symbols.clone())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gair=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Slot { date, concurrent, run } => {
            let request = if concurrent {
                ComputeRequest::Concurrent { symbols: run.symbols(), date }
            } else {
                ComputeRequest::Slot { symbols: run.symbols(), date }
            };
            run_request(&run, |_| Ok(request))
        }
        Commands::Range { start, end, run } => {
            if start > end {
                bail!("--start {start} is after --end {end}");
            }
            let symbols = run.symbols();
            run_request(&run, |orch| {
                let dates = orch.trading_days(start, end)?;
                if dates.is_empty() {
                    bail!("no trading days between {start} and {end}");
                }
                Ok(ComputeRequest::Range { symbols, dates })
            })
        }
        Commands::Generate {
            out,
            universe,
            symbols,
            start,
            end,
        } => run_generate(out, universe, symbols, start, end),
        Commands::Fields {
            indicator: Some(indicator),
            ..
        } => {
            print_indicator(indicator);
            Ok(())
        }
        Commands::Fields {
            indicator: None,
            store_dir,
        } => {
            print_fields(store_dir.map(ParquetStore::new).as_ref());
            Ok(())
        }
    }
}

fn run_request(
    run: &RunArgs,
    build: impl FnOnce(&Orchestrator) -> Result<ComputeRequest>,
) -> Result<()> {
    let config = run.resolve_config()?;
    let orch = Orchestrator::new(config.open_store(), config.compute_options());
    info!(store = orch.store().name(), "store opened");

    let request = build(&orch)?;
    let plan = config.output_plan();
    let (table, written) = orch.run(&request, &plan)?;

    print_summary(&table);
    for path in &written {
        println!("  wrote {}", path.display());
    }
    if plan.is_empty() {
        println!("No outputs configured; pass --csv-dir, --json or --sink-dir to save results.");
    }
    Ok(())
}

fn run_generate(
    out: PathBuf,
    universe: usize,
    symbols: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    let source = if symbols.is_empty() {
        if universe == 0 {
            bail!("--universe must be at least 1");
        }
        SyntheticStore::with_universe(universe, start, end)
    } else {
        SyntheticStore::new(&symbols, start, end)
    };
    let target = ParquetStore::new(&out);
    let records = materialize(&source, &target)
        .with_context(|| format!("failed to write store to {}", out.display()))?;
    println!(
        "Generated {} symbols × {} days ({records} records) in {}",
        gair_core::AttributeStore::list_symbols(&source)?.len(),
        source.calendar().len(),
        out.display()
    );
    Ok(())
}

fn print_fields(store: Option<&ParquetStore>) {
    println!("Raw fields ({}):", Field::ALL.len());
    match store {
        Some(store) => {
            let present = store.available_fields();
            for field in Field::ALL {
                let mark = if present.contains(&field) { "x" } else { " " };
                println!("  [{mark}] {}", field.as_str());
            }
            println!(
                "{} of {} present in {}",
                present.len(),
                Field::ALL.len(),
                store.dir().display()
            );
        }
        None => {
            for field in Field::ALL {
                println!("  {}", field.as_str());
            }
        }
    }
    println!();
    println!("Indicators ({}, max lookback {MAX_LOOKBACK}):", Indicator::ALL.len());
    for indicator in Indicator::ALL {
        println!(
            "  {:<8} table {:<4} lookback {:>2}",
            indicator.name(),
            indicator.table_name(),
            indicator.lookback()
        );
    }
}

fn print_indicator(indicator: Indicator) {
    println!("{} (table {})", indicator.name(), indicator.table_name());
    println!("  lookback: {} rows", indicator.lookback());
    if let Some(factor) = indicator.factor() {
        let fields: Vec<&str> = factor.fields().iter().map(|f| f.as_str()).collect();
        println!("  factor:   {} from {}", factor.name(), fields.join(", "));
    }
    if let Some((horizon, family)) = indicator.family() {
        println!("  horizon:  {horizon:?} (lag {})", horizon.lag());
        println!("  family:   {family:?}");
    }
}

fn print_summary(table: &IndicatorTable) {
    let (indicators, dates, symbols) = table.shape();
    println!("=== Indicator table ===");
    println!("Indicators: {indicators}");
    match (table.dates().first(), table.dates().last()) {
        (Some(first), Some(last)) if first != last => {
            println!("Dates:      {dates} ({first} .. {last})")
        }
        (Some(first), _) => println!("Date:       {first}"),
        _ => println!("Dates:      0"),
    }
    println!("Symbols:    {symbols}");

    let cells = table
        .indicators()
        .iter()
        .filter_map(|i| table.frame(*i))
        .map(|f| f.len())
        .sum::<usize>();
    let missing = table
        .indicators()
        .iter()
        .filter_map(|i| table.frame(*i))
        .flat_map(|f| f.iter())
        .filter(|v| v.is_nan())
        .count();
    println!("Missing:    {missing} of {cells} values");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_accepts_any_indicator_spelling() {
        for arg in ["M2L(n)", "M2L", "m2l"] {
            let cli = Cli::try_parse_from(["gair", "fields", arg]).unwrap();
            match cli.command {
                Commands::Fields { indicator, .. } => assert_eq!(indicator, Some(Indicator::M2L)),
                _ => panic!("expected fields"),
            }
        }
        assert!(Cli::try_parse_from(["gair", "fields", "X9"]).is_err());
    }

    #[test]
    fn fields_without_indicator_lists_all() {
        let cli = Cli::try_parse_from(["gair", "fields", "--store-dir", "data"]).unwrap();
        match cli.command {
            Commands::Fields { indicator, store_dir } => {
                assert!(indicator.is_none());
                assert_eq!(store_dir, Some(PathBuf::from("data")));
            }
            _ => panic!("expected fields"),
        }
    }
}
