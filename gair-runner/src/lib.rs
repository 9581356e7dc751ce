//! GAIR Runner: store-backed indicator computation and output.
//!
//! This crate builds on `gair-core` to provide:
//! - Bundle loading with a bounded parallel field fan-out
//! - Slot, range and concurrent-slot orchestration
//! - TOML configuration
//! - A deterministic synthetic attribute store
//! - CSV, JSON and row-sink outputs for finished tables

pub mod config;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod synthetic;

pub use config::{ComputeConfig, ConfigError, GairConfig, OutputConfig, StoreConfig, StoreKind};
pub use data_loader::{fetch_attributes, fetch_attributes_named, materialize, DEFAULT_FETCH_THREADS};
pub use error::ComputeError;
pub use export::{
    emit, export_json, persist, write_csv, CsvLayout, JsonlSink, OutputPlan, RowSink, SinkRow,
    TableDocument,
};
pub use orchestrator::{ComputeOptions, ComputeRequest, Orchestrator, DEFAULT_FRAGMENT_SIZE};
pub use synthetic::SyntheticStore;
