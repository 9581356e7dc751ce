//! Attribute store trait and structured error types.
//!
//! The `AttributeStore` trait abstracts over the relational source of raw
//! attributes (Parquet files, in-memory fixtures, synthetic generators) so the
//! calculation core never touches I/O directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::field::Field;

/// One `(date, symbol, value)` cell of a raw attribute table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub value: f64,
}

impl AttributeRecord {
    pub fn new(date: NaiveDate, symbol: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            value,
        }
    }
}

/// Failures reported by a storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no data for field '{field}'")]
    MissingField { field: Field },

    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("store error: {0}")]
    Other(String),
}

/// Source of trading days, symbols and raw attribute values.
///
/// Implementations must be shareable across worker threads; every method
/// takes `&self` and returns owned data.
pub trait AttributeStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    /// Ascending trading days within the optional bounds.
    fn list_trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    /// The full symbol universe.
    fn list_symbols(&self) -> Result<Vec<String>, StoreError>;

    /// Display names keyed by symbol. Stores without names return an empty map.
    fn symbol_names(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(BTreeMap::new())
    }

    /// Records of one field, optionally restricted to symbols and days.
    fn fetch_attribute(
        &self,
        symbols: Option<&[String]>,
        trading_days: Option<&[NaiveDate]>,
        field: Field,
    ) -> Result<Vec<AttributeRecord>, StoreError>;
}
