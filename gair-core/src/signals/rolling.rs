//! Five-row rolling sums: x2L, x4L and ZQ.

use crate::error::CalcResult;
use crate::indicator::Indicator;
use crate::series::Series;

use super::input::{CalcArgs, Input};

/// Taps in a rolling sum: offsets 0, -1, -2, -3, -4.
pub const ROLLING_TAPS: usize = 5;

/// A window whose head is `head` and whose remaining taps derive from `args`.
pub fn rolling_window<'a>(head: Input<'a>, args: CalcArgs<'a>) -> [Input<'a>; ROLLING_TAPS] {
    [
        head,
        args.derive(),
        args.derive(),
        args.derive(),
        args.derive(),
    ]
}

/// Sum of `of` over the window; tap k is evaluated `k` rows back.
///
/// Taps are added left to right in tap order, so a cached series and a
/// derived one yield bit-identical results.
pub fn rolling_sum(of: Indicator, window: [Input<'_>; ROLLING_TAPS]) -> CalcResult<Series> {
    let taps = window
        .into_iter()
        .enumerate()
        .map(|(k, input)| input.resolve_at(-(k as i64), |a| of.derive(a)))
        .collect::<CalcResult<Vec<_>>>()?;
    let refs: Vec<&Series> = taps.iter().map(|t| t.as_ref()).collect();
    Series::sum(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_all_provided_taps_in_order() {
        let taps: Vec<Series> = (0..5).map(|k| Series::new(vec![k as f64, 1.0])).collect();
        let window = [
            Input::Provided(&taps[0]),
            Input::Provided(&taps[1]),
            Input::Provided(&taps[2]),
            Input::Provided(&taps[3]),
            Input::Provided(&taps[4]),
        ];
        let s = rolling_sum(Indicator::M2, window).unwrap();
        assert_eq!(s.values(), &[10.0, 5.0]);
    }

    #[test]
    fn nan_in_any_tap_propagates() {
        let ok = Series::new(vec![1.0]);
        let missing = Series::new(vec![f64::NAN]);
        let window = [
            Input::Provided(&ok),
            Input::Provided(&ok),
            Input::Provided(&missing),
            Input::Provided(&ok),
            Input::Provided(&ok),
        ];
        assert!(rolling_sum(Indicator::D4, window).unwrap().values()[0].is_nan());
    }
}
