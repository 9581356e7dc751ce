//! Gated signals: x2B/x4B and the Z, WZ and T triggers.
//!
//! Every output here is normalized so that a zero is always `+0.0`.

use crate::error::CalcResult;
use crate::indicator::{Family, Horizon, Indicator};
use crate::series::Series;

use super::input::Input;

/// `signal` where it differs from `reference`, else 0.
pub fn conditional_zero(signal: &Series, reference: &Series) -> CalcResult<Series> {
    Ok(signal
        .zip_with(reference, |s, r| if s == r { 0.0 } else { s })?
        .normalize_zero())
}

fn gate<'a>(
    horizon: Horizon,
    family: Family,
    signal: Input<'a>,
    close_trend: Input<'a>,
) -> CalcResult<Series> {
    let signal_indicator = horizon.indicator(family);
    let close_indicator = horizon.indicator(Family::CloseTrend);
    let signal = signal.resolve(|a| signal_indicator.derive(a))?;
    let reference = close_trend.resolve(|a| close_indicator.derive(a))?;
    conditional_zero(&signal, &reference)
}

/// x2B: the sum trend, zeroed where it agrees with the close trend.
pub fn gate_sum_trend<'a>(
    horizon: Horizon,
    sum_trend: Input<'a>,
    close_trend: Input<'a>,
) -> CalcResult<Series> {
    gate(horizon, Family::SumTrend, sum_trend, close_trend)
}

/// x4B: the factor trend, zeroed where it agrees with the close trend.
pub fn gate_factor_trend<'a>(
    horizon: Horizon,
    factor_trend: Input<'a>,
    close_trend: Input<'a>,
) -> CalcResult<Series> {
    gate(horizon, Family::FactorTrend, factor_trend, close_trend)
}

/// Reversal triggers built on a rolling sum-trend and a close trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// M2L where M2L < 0 and M3 == 1.
    Z,
    /// W2L where W2L < 0 and W3 == 1.
    WZ,
    /// M2L where M2L > 0 and M3 == -1.
    T,
}

impl Trigger {
    pub fn indicator(self) -> Indicator {
        match self {
            Trigger::Z => Indicator::Z,
            Trigger::WZ => Indicator::WZ,
            Trigger::T => Indicator::T,
        }
    }

    fn horizon(self) -> Horizon {
        match self {
            Trigger::Z | Trigger::T => Horizon::Month,
            Trigger::WZ => Horizon::Week,
        }
    }

    /// NaN fails every comparison, so a missing input never fires.
    fn fires(self, run: f64, close_trend: f64) -> bool {
        match self {
            Trigger::Z | Trigger::WZ => run < 0.0 && close_trend == 1.0,
            Trigger::T => run > 0.0 && close_trend == -1.0,
        }
    }
}

/// The rolling sum-trend where the trigger fires, else 0.
pub fn trigger<'a>(kind: Trigger, run: Input<'a>, close_trend: Input<'a>) -> CalcResult<Series> {
    let h = kind.horizon();
    let run_indicator = h.indicator(Family::SumTrendRun);
    let close_indicator = h.indicator(Family::CloseTrend);
    let run = run.resolve(|a| run_indicator.derive(a))?;
    let trend = close_trend.resolve(|a| close_indicator.derive(a))?;
    Ok(run
        .zip_with(&trend, |r, t| if kind.fires(r, t) { r } else { 0.0 })?
        .normalize_zero())
}
