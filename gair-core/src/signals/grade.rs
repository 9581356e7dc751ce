//! Grade bands (x1) and the weighted J signal.

use crate::error::CalcResult;
use crate::indicator::{Family, Horizon, Indicator};
use crate::series::Series;

use super::input::Input;

/// Map a horizon sum onto its grade band.
///
/// | sum            | grade |
/// |----------------|-------|
/// | > 5            | -3    |
/// | (4, 5]         | -2    |
/// | (3, 4]         | -1    |
/// | <= -9          | 5     |
/// | (-9, -8]       | 4     |
/// | (-8, -7]       | 3     |
/// | (-7, -6]       | 2     |
/// | (-6, -5]       | 1     |
/// | otherwise      | 0     |
///
/// Every band is a comparison, so a missing sum grades 0.
pub fn grade(v: f64) -> f64 {
    if v > 5.0 {
        -3.0
    } else if v > 4.0 {
        -2.0
    } else if v > 3.0 {
        -1.0
    } else if v <= -9.0 {
        5.0
    } else if v <= -8.0 {
        4.0
    } else if v <= -7.0 {
        3.0
    } else if v <= -6.0 {
        2.0
    } else if v <= -5.0 {
        1.0
    } else {
        0.0
    }
}

/// x1: grade of the horizon sum.
pub fn graded(horizon: Horizon, sum: Input<'_>) -> CalcResult<Series> {
    let sum_indicator = horizon.indicator(Family::Sum);
    let sum = sum.resolve(|a| sum_indicator.derive(a))?;
    Ok(sum.map(grade))
}

/// J = 0.25·M1 + 0.5·W1 + D1.
pub fn weighted<'a>(m1: Input<'a>, w1: Input<'a>, d1: Input<'a>) -> CalcResult<Series> {
    let m1 = m1.resolve(|a| Indicator::M1.derive(a))?;
    let w1 = w1.resolve(|a| Indicator::W1.derive(a))?;
    let d1 = d1.resolve(|a| Indicator::D1.derive(a))?;
    m1.zip_with(&w1, |m, w| 0.25 * m + 0.5 * w)?
        .zip_with(&d1, |mw, d| mw + d)
}
