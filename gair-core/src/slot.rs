//! Slot evaluation: all 36 indicators for every bundle symbol on one date.
//!
//! Factors at the target date are computed once and handed to the signal
//! formulas as provided inputs. Only the lagged and rolling taps are
//! derived, so every intermediate is evaluated at most once per offset it is
//! needed at.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::trace;

use crate::data::DataBundle;
use crate::error::{CalcError, CalcResult};
use crate::factors::Factor;
use crate::indicator::{Family, Horizon, Indicator};
use crate::series::Series;
use crate::signals::{
    composite, gate_factor_trend, gate_sum_trend, graded, rolling_sum, rolling_window, trend_of_close,
    trend_of_factor, trend_of_sum, trigger, weighted, CalcArgs, Input, Trigger,
};
use crate::table::IndicatorTable;

struct BaseFactors {
    q: Series,
    m: Series,
    w: Series,
    d: Series,
    close: Series,
}

impl BaseFactors {
    fn evaluate(args: &CalcArgs<'_>) -> CalcResult<Self> {
        Ok(Self {
            q: Factor::Q.evaluate(args)?,
            m: Factor::M.evaluate(args)?,
            w: Factor::W.evaluate(args)?,
            d: Factor::D.evaluate(args)?,
            close: Factor::Close.evaluate(args)?,
        })
    }

    fn get(&self, factor: Factor) -> &Series {
        match factor {
            Factor::Q => &self.q,
            Factor::M => &self.m,
            Factor::W => &self.w,
            Factor::D => &self.d,
            Factor::Close => &self.close,
        }
    }
}

/// Evaluate one horizon's nine signals into `out`.
fn evaluate_horizon(
    h: Horizon,
    args: CalcArgs<'_>,
    base: &BaseFactors,
    out: &mut HashMap<Indicator, Series>,
) -> CalcResult<()> {
    let lag_args = args.shifted(-h.lag());
    let (long, short) = h.sum_parts();

    // the short sum part is the horizon factor, so its lag serves both x2 and x4
    let factor_lag = h.factor().evaluate(&lag_args)?;
    let close_lag = Factor::Close.evaluate(&lag_args)?;
    let sum = composite(h, Input::Provided(base.get(long)), Input::Provided(base.get(short)))?;
    let sum_lag = composite(h, Input::Derive(lag_args), Input::Provided(&factor_lag))?;

    let grade = graded(h, Input::Provided(&sum))?;
    let sum_trend = trend_of_sum(h, Input::Provided(&sum), Input::Provided(&sum_lag))?;
    let close_trend = trend_of_close(h, Input::Provided(&base.close), Input::Provided(&close_lag))?;
    let factor_trend = trend_of_factor(
        h,
        Input::Provided(base.get(h.factor())),
        Input::Provided(&factor_lag),
    )?;

    let sum_trend_run = rolling_sum(
        h.indicator(Family::SumTrend),
        rolling_window(Input::Provided(&sum_trend), args),
    )?;
    let factor_trend_run = rolling_sum(
        h.indicator(Family::FactorTrend),
        rolling_window(Input::Provided(&factor_trend), args),
    )?;
    let sum_gate = gate_sum_trend(h, Input::Provided(&sum_trend), Input::Provided(&close_trend))?;
    let factor_gate =
        gate_factor_trend(h, Input::Provided(&factor_trend), Input::Provided(&close_trend))?;

    out.insert(h.indicator(Family::Sum), sum);
    out.insert(h.indicator(Family::Grade), grade);
    out.insert(h.indicator(Family::SumTrend), sum_trend);
    out.insert(h.indicator(Family::CloseTrend), close_trend);
    out.insert(h.indicator(Family::FactorTrend), factor_trend);
    out.insert(h.indicator(Family::SumTrendRun), sum_trend_run);
    out.insert(h.indicator(Family::FactorTrendRun), factor_trend_run);
    out.insert(h.indicator(Family::SumTrendGate), sum_gate);
    out.insert(h.indicator(Family::FactorTrendGate), factor_gate);
    Ok(())
}

fn take(out: &HashMap<Indicator, Series>, indicator: Indicator) -> CalcResult<&Series> {
    out.get(&indicator)
        .ok_or_else(|| CalcError::TableShape(format!("{indicator} was not evaluated")))
}

/// Evaluate every indicator for all bundle symbols at `date`.
///
/// Fails with `DateNotFound` when `date` is not a bundle trading day and
/// with `FieldNotLoaded` when the bundle lacks a raw field.
pub fn evaluate_slot(bundle: &DataBundle, date: NaiveDate) -> CalcResult<IndicatorTable> {
    bundle.calendar().index_of(date)?;
    let args = CalcArgs::with_bundle(bundle, date);
    let base = BaseFactors::evaluate(&args)?;

    let mut out: HashMap<Indicator, Series> = HashMap::with_capacity(Indicator::ALL.len());
    for h in Horizon::ALL {
        evaluate_horizon(h, args, &base, &mut out)?;
    }

    let j = weighted(
        Input::Provided(take(&out, Indicator::M1)?),
        Input::Provided(take(&out, Indicator::W1)?),
        Input::Provided(take(&out, Indicator::D1)?),
    )?;
    let zq = rolling_sum(Indicator::J, rolling_window(Input::Provided(&j), args))?;
    let z = trigger(
        Trigger::Z,
        Input::Provided(take(&out, Indicator::M2L)?),
        Input::Provided(take(&out, Indicator::M3)?),
    )?;
    let wz = trigger(
        Trigger::WZ,
        Input::Provided(take(&out, Indicator::W2L)?),
        Input::Provided(take(&out, Indicator::W3)?),
    )?;
    let t = trigger(
        Trigger::T,
        Input::Provided(take(&out, Indicator::M2L)?),
        Input::Provided(take(&out, Indicator::M3)?),
    )?;

    out.insert(Indicator::J, j);
    out.insert(Indicator::ZQ, zq);
    out.insert(Indicator::Z, z);
    out.insert(Indicator::WZ, wz);
    out.insert(Indicator::T, t);
    out.insert(Indicator::Q, base.q);
    out.insert(Indicator::M, base.m);
    out.insert(Indicator::W, base.w);
    out.insert(Indicator::D, base.d);

    let columns = Indicator::ALL
        .into_iter()
        .map(|indicator| {
            out.remove(&indicator)
                .map(|series| (indicator, series))
                .ok_or_else(|| CalcError::TableShape(format!("{indicator} was not evaluated")))
        })
        .collect::<CalcResult<Vec<_>>>()?;

    trace!(%date, symbols = bundle.symbols().len(), "slot evaluated");
    IndicatorTable::from_slot(date, bundle.symbols().to_vec(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AttributeStore, InMemoryStore};
    use crate::field::Field;

    fn store(days: usize) -> InMemoryStore {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let days = (0..days as i64).map(|i| start + chrono::Duration::days(i)).collect();
        let mut store = InMemoryStore::new(days);
        for field in Field::ALL {
            store.fill(field, "A", |i| ((i * 7 + 3) % 11) as f64 - 5.0);
            store.fill(field, "B", |i| ((i * 5 + 1) % 13) as f64 / 2.0 - 3.0);
        }
        store.fill(Field::AdjClosePrice, "A", |i| 10.0 + (i % 9) as f64);
        store
    }

    fn bundle(store: &InMemoryStore) -> DataBundle {
        let symbols = store.list_symbols().unwrap();
        DataBundle::fetch(store, &symbols, store.calendar().days(), &Field::ALL).unwrap()
    }

    #[test]
    fn slot_matches_standalone_derivation() {
        let store = store(80);
        let bundle = bundle(&store);
        let date = store.calendar().last().unwrap();
        let table = evaluate_slot(&bundle, date).unwrap();
        assert_eq!(table.indicators(), &Indicator::ALL);

        let args = CalcArgs::with_bundle(&bundle, date);
        for indicator in Indicator::ALL {
            let derived = indicator.derive(&args).unwrap();
            let cached = table.series(indicator, date).unwrap();
            assert!(derived.same_values(&cached), "{indicator}: {derived:?} vs {cached:?}");
        }
    }

    #[test]
    fn unknown_date_fails_fast() {
        let store = store(5);
        let bundle = bundle(&store);
        let absent = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(evaluate_slot(&bundle, absent).unwrap_err().is_not_found());
    }

    #[test]
    fn missing_field_is_configuration_error() {
        let store = store(5);
        let symbols = store.list_symbols().unwrap();
        let partial = DataBundle::fetch(
            &store,
            &symbols,
            store.calendar().days(),
            &[Field::AdjClosePrice, Field::Scdq],
        )
        .unwrap();
        let date = store.calendar().last().unwrap();
        assert!(evaluate_slot(&partial, date).unwrap_err().is_configuration());
    }
}
