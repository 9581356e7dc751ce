//! Signal formulas over factor series.
//!
//! Each formula takes its upstream series as [`Input`]s and is usable on its
//! own; [`crate::Indicator::derive`] wires them together recursively.

pub mod gate;
pub mod grade;
pub mod input;
pub mod rolling;
pub mod trend;

pub use gate::{conditional_zero, gate_factor_trend, gate_sum_trend, trigger, Trigger};
pub use grade::{grade, graded, weighted};
pub use input::{CalcArgs, Input, Source};
pub use rolling::{rolling_sum, rolling_window, ROLLING_TAPS};
pub use trend::{composite, difference_sign, sign, trend_of_close, trend_of_factor, trend_of_sum};
