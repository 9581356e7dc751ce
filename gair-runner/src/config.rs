//! TOML run configuration.
//!
//! ```toml
//! [store]
//! kind = "synthetic"      # or "parquet"
//! dir = "data"
//! universe = 50
//!
//! [compute]
//! fragment_size = 200
//! fetch_threads = 5
//!
//! [output]
//! csv_dir = "out"
//! layout = "indicator"
//! ```
//!
//! Every key is optional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use gair_core::{AttributeStore, ParquetStore};

use crate::data_loader::DEFAULT_FETCH_THREADS;
use crate::export::{CsvLayout, OutputPlan};
use crate::orchestrator::{ComputeOptions, DEFAULT_FRAGMENT_SIZE};
use crate::synthetic::SyntheticStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Parquet,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Parquet store directory.
    pub dir: PathBuf,
    /// Synthetic symbols; generated codes are used when empty.
    pub symbols: Vec<String>,
    /// Synthetic universe size when `symbols` is empty.
    pub universe: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Parquet,
            dir: PathBuf::from("data"),
            symbols: Vec::new(),
            universe: 20,
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 29).unwrap_or_default(),
        }
    }
}

impl StoreConfig {
    pub fn synthetic(&self) -> SyntheticStore {
        if self.symbols.is_empty() {
            SyntheticStore::with_universe(self.universe, self.start, self.end)
        } else {
            SyntheticStore::new(&self.symbols, self.start, self.end)
        }
    }

    pub fn open(&self) -> Arc<dyn AttributeStore> {
        match self.kind {
            StoreKind::Parquet => Arc::new(ParquetStore::new(&self.dir)),
            StoreKind::Synthetic => Arc::new(self.synthetic()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    pub fragment_size: usize,
    pub workers: Option<usize>,
    pub fetch_threads: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            workers: None,
            fetch_threads: DEFAULT_FETCH_THREADS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_dir: Option<PathBuf>,
    pub layout: CsvLayout,
    pub json: Option<PathBuf>,
    pub sink_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GairConfig {
    pub store: StoreConfig,
    pub compute: ComputeConfig,
    pub output: OutputConfig,
}

impl GairConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GairConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compute.fragment_size == 0 {
            return Err(ConfigError::Invalid("compute.fragment_size must be at least 1".into()));
        }
        if self.compute.fetch_threads == 0 {
            return Err(ConfigError::Invalid("compute.fetch_threads must be at least 1".into()));
        }
        if self.compute.workers == Some(0) {
            return Err(ConfigError::Invalid("compute.workers must be at least 1".into()));
        }
        if self.store.kind == StoreKind::Synthetic {
            if self.store.start > self.store.end {
                return Err(ConfigError::Invalid(format!(
                    "store.start {} is after store.end {}",
                    self.store.start, self.store.end
                )));
            }
            if self.store.symbols.is_empty() && self.store.universe == 0 {
                return Err(ConfigError::Invalid(
                    "synthetic store needs symbols or a non-zero universe".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn compute_options(&self) -> ComputeOptions {
        ComputeOptions {
            fragment_size: self.compute.fragment_size,
            workers: self.compute.workers,
            fetch_threads: self.compute.fetch_threads,
        }
    }

    pub fn output_plan(&self) -> OutputPlan {
        OutputPlan {
            csv_dir: self.output.csv_dir.clone(),
            layout: self.output.layout,
            json: self.output.json.clone(),
            sink_dir: self.output.sink_dir.clone(),
        }
    }

    pub fn open_store(&self) -> Arc<dyn AttributeStore> {
        self.store.open()
    }
}
