//! Error types for the calculation core.
//!
//! Configuration and lookup failures are raised immediately. Missing raw values
//! are never errors: they travel through the formulas as `f64::NAN`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::data::StoreError;
use crate::field::Field;

/// Result alias used throughout the core.
pub type CalcResult<T> = Result<T, CalcError>;

#[derive(Debug, Error)]
pub enum CalcError {
    /// A raw attribute name outside the recognized field set.
    #[error("invalid field '{name}': not a recognized raw attribute")]
    InvalidField { name: String },

    #[error("unknown indicator '{name}'")]
    UnknownIndicator { name: String },

    /// The date is not part of the resolved trading-day sequence.
    #[error("date {date} not found in trading-day sequence")]
    DateNotFound { date: NaiveDate },

    /// A recognized field that the supplied bundle does not carry.
    #[error("field '{field}' not loaded in data bundle")]
    FieldNotLoaded { field: Field },

    #[error("series length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("indicator table shape error: {0}")]
    TableShape(String),

    #[error("no tables to combine")]
    EmptyTable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CalcError {
    /// True for the lookup failure raised when a date is absent from the calendar.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CalcError::DateNotFound { .. })
    }

    /// True for caller configuration mistakes (unknown or unloaded fields).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidField { .. }
                | CalcError::UnknownIndicator { .. }
                | CalcError::FieldNotLoaded { .. }
        )
    }
}
