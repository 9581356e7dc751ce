//! Horizon sums and sign-of-change trends (x2, x3, x4).

use crate::error::CalcResult;
use crate::factors::Factor;
use crate::indicator::{Family, Horizon};
use crate::series::Series;

use super::input::Input;

/// -1, 0 or 1 by the sign of `v`; NaN stays NaN and zero is `+0.0`.
pub fn sign(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Element-wise `sign(current - lagged)`.
pub fn difference_sign(current: &Series, lagged: &Series) -> CalcResult<Series> {
    current.zip_with(lagged, |c, l| sign(c - l))
}

/// Ms = Q + M, Ws = M + W, Ds = W + D.
pub fn composite<'a>(horizon: Horizon, long: Input<'a>, short: Input<'a>) -> CalcResult<Series> {
    let (long_factor, short_factor) = horizon.sum_parts();
    let long = long.resolve(|a| long_factor.evaluate(a))?;
    let short = short.resolve(|a| short_factor.evaluate(a))?;
    Series::sum(&[&long, &short])
}

/// x2: direction of the horizon sum over the horizon lag.
pub fn trend_of_sum<'a>(horizon: Horizon, sum: Input<'a>, sum_lag: Input<'a>) -> CalcResult<Series> {
    let sum_indicator = horizon.indicator(Family::Sum);
    let current = sum.resolve(|a| sum_indicator.derive(a))?;
    let lagged = sum_lag.resolve_at(-horizon.lag(), |a| sum_indicator.derive(a))?;
    difference_sign(&current, &lagged)
}

/// x3: direction of the adjusted close over the horizon lag.
pub fn trend_of_close<'a>(
    horizon: Horizon,
    close: Input<'a>,
    close_lag: Input<'a>,
) -> CalcResult<Series> {
    let current = close.resolve(|a| Factor::Close.evaluate(a))?;
    let lagged = close_lag.resolve_at(-horizon.lag(), |a| Factor::Close.evaluate(a))?;
    difference_sign(&current, &lagged)
}

/// x4: direction of the horizon factor (M, W or D) over the horizon lag.
pub fn trend_of_factor<'a>(
    horizon: Horizon,
    factor: Input<'a>,
    factor_lag: Input<'a>,
) -> CalcResult<Series> {
    let f = horizon.factor();
    let current = factor.resolve(|a| f.evaluate(a))?;
    let lagged = factor_lag.resolve_at(-horizon.lag(), |a| f.evaluate(a))?;
    difference_sign(&current, &lagged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_cases() {
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert!(sign(-0.0).is_sign_positive());
        assert_eq!(sign(0.0), 0.0);
        assert!(sign(f64::NAN).is_nan());
    }

    #[test]
    fn composite_adds_provided_parts() {
        let q = Series::new(vec![1.0, f64::NAN]);
        let m = Series::new(vec![2.0, 1.0]);
        let s = composite(Horizon::Month, (&q).into(), (&m).into()).unwrap();
        assert_eq!(s.get(0), Some(3.0));
        assert!(s.get(1).unwrap().is_nan());
    }

    #[test]
    fn trend_compares_against_lag() {
        let now = Series::new(vec![3.0, 1.0, 2.0, f64::NAN]);
        let then = Series::new(vec![1.0, 3.0, 2.0, 0.0]);
        let t = trend_of_sum(Horizon::Week, (&now).into(), (&then).into()).unwrap();
        assert_eq!(&t.values()[..3], &[1.0, -1.0, 0.0]);
        assert!(t.values()[3].is_nan());
    }

    #[test]
    fn mismatched_lengths_fail() {
        let a = Series::new(vec![1.0]);
        let b = Series::new(vec![1.0, 2.0]);
        assert!(trend_of_close(Horizon::Day, (&a).into(), (&b).into()).is_err());
    }
}
