//! Supplied-or-derive inputs.
//!
//! Every signal formula takes its upstream series as [`Input`]s. A caller
//! that already holds a series passes it as `Provided`; otherwise the formula
//! receives `Derive` with the request's base [`CalcArgs`] and computes the
//! upstream value itself, applying its own row offsets.

use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt;

use crate::data::{AttributeStore, DataBundle};
use crate::error::CalcResult;
use crate::series::Series;

/// Where raw attribute values come from.
#[derive(Clone, Copy)]
pub enum Source<'a> {
    /// Request-scoped matrices shared by every formula in a slot.
    Bundle(&'a DataBundle),
    /// Direct store access; each factor fetches its own history window.
    Store {
        store: &'a dyn AttributeStore,
        symbols: &'a [String],
    },
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bundle(bundle) => f
                .debug_struct("Bundle")
                .field("symbols", &bundle.symbols().len())
                .field("days", &bundle.calendar().len())
                .finish(),
            Source::Store { store, symbols } => f
                .debug_struct("Store")
                .field("store", &store.name())
                .field("symbols", &symbols.len())
                .finish(),
        }
    }
}

/// Evaluation context: a source, a target date and a row offset.
#[derive(Debug, Clone, Copy)]
pub struct CalcArgs<'a> {
    pub source: Source<'a>,
    pub target_date: NaiveDate,
    /// Trading-day offset applied to `target_date`; 0 or negative in practice.
    pub offset: i64,
}

impl<'a> CalcArgs<'a> {
    pub fn new(source: Source<'a>, target_date: NaiveDate) -> Self {
        Self {
            source,
            target_date,
            offset: 0,
        }
    }

    pub fn with_bundle(bundle: &'a DataBundle, target_date: NaiveDate) -> Self {
        Self::new(Source::Bundle(bundle), target_date)
    }

    pub fn with_store(
        store: &'a dyn AttributeStore,
        symbols: &'a [String],
        target_date: NaiveDate,
    ) -> Self {
        Self::new(Source::Store { store, symbols }, target_date)
    }

    /// The same context moved by `delta` further trading rows.
    pub fn shifted(&self, delta: i64) -> Self {
        Self {
            offset: self.offset + delta,
            ..*self
        }
    }

    /// Shorthand for `Input::Derive(self)`.
    pub fn derive(self) -> Input<'a> {
        Input::Derive(self)
    }
}

/// An upstream series, either supplied by the caller or derived on demand.
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    Provided(&'a Series),
    Derive(CalcArgs<'a>),
}

impl<'a> Input<'a> {
    /// Resolve at the base offset.
    pub fn resolve<F>(self, derive: F) -> CalcResult<Cow<'a, Series>>
    where
        F: FnOnce(&CalcArgs<'a>) -> CalcResult<Series>,
    {
        self.resolve_at(0, derive)
    }

    /// Resolve a tap `offset` rows from the base. A provided series is
    /// already the tap's value and is returned as is.
    pub fn resolve_at<F>(self, offset: i64, derive: F) -> CalcResult<Cow<'a, Series>>
    where
        F: FnOnce(&CalcArgs<'a>) -> CalcResult<Series>,
    {
        match self {
            Input::Provided(series) => Ok(Cow::Borrowed(series)),
            Input::Derive(args) => Ok(Cow::Owned(derive(&args.shifted(offset))?)),
        }
    }
}

impl<'a> From<&'a Series> for Input<'a> {
    fn from(series: &'a Series) -> Self {
        Input::Provided(series)
    }
}
