//! Errors from the orchestration layer.

use gair_core::{CalcError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error(transparent)]
    Calc(#[from] CalcError),

    /// A symbol fragment failed; the whole batch is abandoned.
    #[error("worker for fragment {fragment} failed: {source}")]
    Worker {
        fragment: usize,
        #[source]
        source: CalcError,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("empty date range")]
    EmptyRange,
}

impl From<StoreError> for ComputeError {
    fn from(e: StoreError) -> Self {
        ComputeError::Calc(CalcError::Store(e))
    }
}

impl ComputeError {
    /// The underlying calculation error, looking through worker failures.
    pub fn calc(&self) -> Option<&CalcError> {
        match self {
            ComputeError::Calc(e) | ComputeError::Worker { source: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.calc().is_some_and(CalcError::is_not_found)
    }
}
