//! The indicator catalogue.
//!
//! Thirty-six named outputs: four base factors, three horizon sums and the
//! per-horizon grade, trend, rolling and gated signals, plus the combined J,
//! Z, WZ, T and ZQ. [`Indicator::derive`] evaluates any of them from raw
//! attributes alone; the slot evaluator computes them together and shares
//! intermediates instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CalcError, CalcResult};
use crate::factors::Factor;
use crate::series::Series;
use crate::signals::{
    composite, gate_factor_trend, gate_sum_trend, graded, rolling_sum, rolling_window, trend_of_close,
    trend_of_factor, trend_of_sum, trigger, weighted, CalcArgs, Trigger, ROLLING_TAPS,
};

/// Signal horizon: month (20 rows), week (5 rows) or day (1 row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    Month,
    Week,
    Day,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Month, Horizon::Week, Horizon::Day];

    /// Comparison lag in trading rows.
    pub const fn lag(self) -> i64 {
        self.lag_rows() as i64
    }

    pub const fn lag_rows(self) -> usize {
        match self {
            Horizon::Month => 20,
            Horizon::Week => 5,
            Horizon::Day => 1,
        }
    }

    /// The two factors whose sum is this horizon's composite.
    pub const fn sum_parts(self) -> (Factor, Factor) {
        match self {
            Horizon::Month => (Factor::Q, Factor::M),
            Horizon::Week => (Factor::M, Factor::W),
            Horizon::Day => (Factor::W, Factor::D),
        }
    }

    /// The factor the x4 trend compares against its lag.
    pub const fn factor(self) -> Factor {
        match self {
            Horizon::Month => Factor::M,
            Horizon::Week => Factor::W,
            Horizon::Day => Factor::D,
        }
    }

    pub const fn indicator(self, family: Family) -> Indicator {
        use Family::*;
        use Indicator::*;
        match (self, family) {
            (Horizon::Month, Sum) => Ms,
            (Horizon::Month, Grade) => M1,
            (Horizon::Month, SumTrend) => M2,
            (Horizon::Month, CloseTrend) => M3,
            (Horizon::Month, FactorTrend) => M4,
            (Horizon::Month, SumTrendRun) => M2L,
            (Horizon::Month, FactorTrendRun) => M4L,
            (Horizon::Month, SumTrendGate) => M2B,
            (Horizon::Month, FactorTrendGate) => M4B,
            (Horizon::Week, Sum) => Ws,
            (Horizon::Week, Grade) => W1,
            (Horizon::Week, SumTrend) => W2,
            (Horizon::Week, CloseTrend) => W3,
            (Horizon::Week, FactorTrend) => W4,
            (Horizon::Week, SumTrendRun) => W2L,
            (Horizon::Week, FactorTrendRun) => W4L,
            (Horizon::Week, SumTrendGate) => W2B,
            (Horizon::Week, FactorTrendGate) => W4B,
            (Horizon::Day, Sum) => Ds,
            (Horizon::Day, Grade) => D1,
            (Horizon::Day, SumTrend) => D2,
            (Horizon::Day, CloseTrend) => D3,
            (Horizon::Day, FactorTrend) => D4,
            (Horizon::Day, SumTrendRun) => D2L,
            (Horizon::Day, FactorTrendRun) => D4L,
            (Horizon::Day, SumTrendGate) => D2B,
            (Horizon::Day, FactorTrendGate) => D4B,
        }
    }
}

/// Per-horizon signal families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Ms, Ws, Ds
    Sum,
    /// x1: banded grade of the sum
    Grade,
    /// x2: sign of the sum's change over the lag
    SumTrend,
    /// x3: sign of the close's change over the lag
    CloseTrend,
    /// x4: sign of the factor's change over the lag
    FactorTrend,
    /// x2L
    SumTrendRun,
    /// x4L
    FactorTrendRun,
    /// x2B
    SumTrendGate,
    /// x4B
    FactorTrendGate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Q,
    M,
    W,
    D,
    Ms,
    Ws,
    Ds,
    M1,
    M2,
    M3,
    M4,
    W1,
    W2,
    W3,
    W4,
    D1,
    D2,
    D3,
    D4,
    J,
    M2L,
    W2L,
    D2L,
    M4L,
    W4L,
    D4L,
    M2B,
    W2B,
    D2B,
    M4B,
    W4B,
    D4B,
    Z,
    WZ,
    T,
    ZQ,
}

/// Largest lookback of any indicator, in trading rows.
pub const MAX_LOOKBACK: usize = max_lookback();

const fn max_lookback() -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < Indicator::ALL.len() {
        let lookback = Indicator::ALL[i].lookback();
        if lookback > max {
            max = lookback;
        }
        i += 1;
    }
    max
}

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

impl Indicator {
    /// Output order of a slot table.
    pub const ALL: [Indicator; 36] = {
        use Indicator::*;
        [
            Q, M, W, D, Ms, Ws, Ds, M1, M2, M3, M4, W1, W2, W3, W4, D1, D2, D3, D4, J, M2L, W2L,
            D2L, M4L, W4L, D4L, M2B, W2B, D2B, M4B, W4B, D4B, Z, WZ, T, ZQ,
        ]
    };

    /// Display name, e.g. `M2L(n)`.
    pub fn name(self) -> &'static str {
        use Indicator::*;
        match self {
            Q => "Q(n)",
            M => "M(n)",
            W => "W(n)",
            D => "D(n)",
            Ms => "Ms(n)",
            Ws => "Ws(n)",
            Ds => "Ds(n)",
            M1 => "M1(n)",
            M2 => "M2(n)",
            M3 => "M3(n)",
            M4 => "M4(n)",
            W1 => "W1(n)",
            W2 => "W2(n)",
            W3 => "W3(n)",
            W4 => "W4(n)",
            D1 => "D1(n)",
            D2 => "D2(n)",
            D3 => "D3(n)",
            D4 => "D4(n)",
            J => "J(n)",
            M2L => "M2L(n)",
            W2L => "W2L(n)",
            D2L => "D2L(n)",
            M4L => "M4L(n)",
            W4L => "W4L(n)",
            D4L => "D4L(n)",
            M2B => "M2B(n)",
            W2B => "W2B(n)",
            D2B => "D2B(n)",
            M4B => "M4B(n)",
            W4B => "W4B(n)",
            D4B => "D4B(n)",
            Z => "Z(n)",
            WZ => "WZ(n)",
            T => "T(n)",
            ZQ => "ZQ(n)",
        }
    }

    /// Name without the `(n)` suffix, lowercased: `M2B(n)` becomes `m2b`.
    pub fn table_name(self) -> String {
        let name = self.name();
        name.strip_suffix("(n)").unwrap_or(name).to_lowercase()
    }

    /// The base factor, for Q, M, W and D.
    pub const fn factor(self) -> Option<Factor> {
        match self {
            Indicator::Q => Some(Factor::Q),
            Indicator::M => Some(Factor::M),
            Indicator::W => Some(Factor::W),
            Indicator::D => Some(Factor::D),
            _ => None,
        }
    }

    /// Horizon and family of a per-horizon signal.
    pub const fn family(self) -> Option<(Horizon, Family)> {
        use Family::*;
        use Horizon::*;
        use Indicator as I;
        let pair = match self {
            I::Ms => (Month, Sum),
            I::M1 => (Month, Grade),
            I::M2 => (Month, SumTrend),
            I::M3 => (Month, CloseTrend),
            I::M4 => (Month, FactorTrend),
            I::M2L => (Month, SumTrendRun),
            I::M4L => (Month, FactorTrendRun),
            I::M2B => (Month, SumTrendGate),
            I::M4B => (Month, FactorTrendGate),
            I::Ws => (Week, Sum),
            I::W1 => (Week, Grade),
            I::W2 => (Week, SumTrend),
            I::W3 => (Week, CloseTrend),
            I::W4 => (Week, FactorTrend),
            I::W2L => (Week, SumTrendRun),
            I::W4L => (Week, FactorTrendRun),
            I::W2B => (Week, SumTrendGate),
            I::W4B => (Week, FactorTrendGate),
            I::Ds => (Day, Sum),
            I::D1 => (Day, Grade),
            I::D2 => (Day, SumTrend),
            I::D3 => (Day, CloseTrend),
            I::D4 => (Day, FactorTrend),
            I::D2L => (Day, SumTrendRun),
            I::D4L => (Day, FactorTrendRun),
            I::D2B => (Day, SumTrendGate),
            I::D4B => (Day, FactorTrendGate),
            _ => return None,
        };
        Some(pair)
    }

    /// Trading rows of history needed before the target date.
    pub const fn lookback(self) -> usize {
        if let Some(factor) = self.factor() {
            return factor.lookback();
        }
        if let Some((h, family)) = self.family() {
            let (long, short) = h.sum_parts();
            let sum = max(long.lookback(), short.lookback());
            let close_trend = Factor::Close.lookback() + h.lag_rows();
            let sum_trend = sum + h.lag_rows();
            let factor_trend = h.factor().lookback() + h.lag_rows();
            return match family {
                Family::Sum | Family::Grade => sum,
                Family::SumTrend => sum_trend,
                Family::CloseTrend => close_trend,
                Family::FactorTrend => factor_trend,
                Family::SumTrendRun => sum_trend + ROLLING_TAPS - 1,
                Family::FactorTrendRun => factor_trend + ROLLING_TAPS - 1,
                Family::SumTrendGate => max(sum_trend, close_trend),
                Family::FactorTrendGate => max(factor_trend, close_trend),
            };
        }
        match self {
            Indicator::J => max(
                Indicator::M1.lookback(),
                max(Indicator::W1.lookback(), Indicator::D1.lookback()),
            ),
            Indicator::Z | Indicator::T => {
                max(Indicator::M2L.lookback(), Indicator::M3.lookback())
            }
            Indicator::WZ => max(Indicator::W2L.lookback(), Indicator::W3.lookback()),
            Indicator::ZQ => Indicator::J.lookback() + ROLLING_TAPS - 1,
            _ => 0,
        }
    }

    /// Evaluate from raw attributes, deriving every upstream series.
    pub fn derive(self, args: &CalcArgs<'_>) -> CalcResult<Series> {
        let args = *args;
        let d = || args.derive();

        if let Some(factor) = self.factor() {
            return factor.evaluate(&args);
        }
        if let Some((h, family)) = self.family() {
            return match family {
                Family::Sum => composite(h, d(), d()),
                Family::Grade => graded(h, d()),
                Family::SumTrend => trend_of_sum(h, d(), d()),
                Family::CloseTrend => trend_of_close(h, d(), d()),
                Family::FactorTrend => trend_of_factor(h, d(), d()),
                Family::SumTrendRun => {
                    rolling_sum(h.indicator(Family::SumTrend), rolling_window(d(), args))
                }
                Family::FactorTrendRun => {
                    rolling_sum(h.indicator(Family::FactorTrend), rolling_window(d(), args))
                }
                Family::SumTrendGate => gate_sum_trend(h, d(), d()),
                Family::FactorTrendGate => gate_factor_trend(h, d(), d()),
            };
        }
        match self {
            Indicator::J => weighted(d(), d(), d()),
            Indicator::Z => trigger(Trigger::Z, d(), d()),
            Indicator::WZ => trigger(Trigger::WZ, d(), d()),
            Indicator::T => trigger(Trigger::T, d(), d()),
            Indicator::ZQ => rolling_sum(Indicator::J, rolling_window(d(), args)),
            other => Err(CalcError::TableShape(format!(
                "{} has no derivation",
                other.name()
            ))),
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `M2L(n)`, `M2L` or `m2l`.
impl FromStr for Indicator {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_suffix("(n)").unwrap_or(trimmed);
        Indicator::ALL
            .into_iter()
            .find(|i| i.table_name().eq_ignore_ascii_case(bare))
            .ok_or_else(|| CalcError::UnknownIndicator {
                name: trimmed.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogue_is_complete_and_unique() {
        let names: HashSet<_> = Indicator::ALL.iter().map(|i| i.name()).collect();
        assert_eq!(names.len(), 36);
        assert_eq!(Indicator::ALL[0], Indicator::Q);
        assert_eq!(Indicator::ALL[35], Indicator::ZQ);
    }

    #[test]
    fn table_names_strip_suffix() {
        assert_eq!(Indicator::M2B.table_name(), "m2b");
        assert_eq!(Indicator::Ms.table_name(), "ms");
        assert_eq!(Indicator::ZQ.table_name(), "zq");
    }

    #[test]
    fn parse_accepts_all_spellings() {
        for i in Indicator::ALL {
            assert_eq!(i.name().parse::<Indicator>().unwrap(), i);
            assert_eq!(i.table_name().parse::<Indicator>().unwrap(), i);
        }
        assert_eq!("wz".parse::<Indicator>().unwrap(), Indicator::WZ);
        assert!("X9(n)".parse::<Indicator>().is_err());
    }

    #[test]
    fn family_and_indicator_are_inverse() {
        for i in Indicator::ALL {
            if let Some((h, family)) = i.family() {
                assert_eq!(h.indicator(family), i);
            }
        }
    }

    #[test]
    fn lookbacks() {
        use Indicator::*;
        let expected = [
            (Q, 40),
            (M, 15),
            (W, 4),
            (D, 0),
            (Ms, 40),
            (Ws, 15),
            (Ds, 4),
            (M2, 60),
            (W2, 20),
            (D2, 5),
            (M3, 20),
            (W3, 5),
            (D3, 1),
            (M4, 35),
            (W4, 9),
            (D4, 1),
            (J, 40),
            (M2L, 64),
            (W2L, 24),
            (D2L, 9),
            (M4L, 39),
            (W4L, 13),
            (D4L, 5),
            (M2B, 60),
            (Z, 64),
            (WZ, 24),
            (T, 64),
            (ZQ, 44),
        ];
        for (indicator, lookback) in expected {
            assert_eq!(indicator.lookback(), lookback, "{indicator}");
        }
        assert_eq!(MAX_LOOKBACK, 64);
    }
}
