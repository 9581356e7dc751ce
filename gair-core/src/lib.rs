//! GAIR Core: trading calendar, attribute storage, factor and signal engines.
//!
//! This crate holds the calculation model:
//! - Trading-day calendar with clamped row offsets
//! - Raw attribute fields, stores and the request-scoped `DataBundle`
//! - Base factors Q, M, W, D and the adjusted close
//! - Signal formulas with supplied-or-derive inputs
//! - Slot evaluation into `IndicatorTable`s
//!
//! Missing raw values are NaN and propagate through every formula.

pub mod calendar;
pub mod data;
pub mod error;
pub mod factors;
pub mod field;
pub mod indicator;
pub mod series;
pub mod signals;
pub mod slot;
pub mod table;

pub use calendar::TradingCalendar;
pub use data::{AttributeRecord, AttributeStore, DataBundle, InMemoryStore, ParquetStore, StoreError};
pub use error::{CalcError, CalcResult};
pub use factors::Factor;
pub use field::Field;
pub use indicator::{Family, Horizon, Indicator, MAX_LOOKBACK};
pub use series::Series;
pub use signals::{CalcArgs, Input, Source};
pub use slot::evaluate_slot;
pub use table::IndicatorTable;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a worker thread receives or returns is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TradingCalendar>();
        require_sync::<TradingCalendar>();
        require_send::<DataBundle>();
        require_sync::<DataBundle>();
        require_send::<IndicatorTable>();
        require_sync::<IndicatorTable>();
        require_send::<CalcError>();
        require_sync::<CalcError>();
        require_send::<InMemoryStore>();
        require_sync::<InMemoryStore>();
        require_send::<ParquetStore>();
        require_sync::<ParquetStore>();
        require_send::<CalcArgs<'static>>();
        require_sync::<CalcArgs<'static>>();
    }

    /// Architecture contract: attribute stores are usable as shared trait
    /// objects across worker threads.
    #[test]
    fn attribute_store_is_object_safe_and_shareable() {
        fn _shared(store: std::sync::Arc<dyn AttributeStore>) -> &'static str {
            let _ = store.name();
            "ok"
        }
    }
}
