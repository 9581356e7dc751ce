//! Base factors Q(n), M(n), W(n), D(n) and the close-price reference.
//!
//! Every factor has the same shape: a same-horizon level, a trend term, half
//! the horizon's CAD value, and a smoothing term averaged from the next
//! shorter horizon.
//!
//! Q(n) = SCDQ(n) + TIQ(n) + CADQ(n)/2 + [SCDM(n) + SCDM(n-20) + SCDM(n-40)] / 6
//! M(n) = SCDM(n) + TIM(n) + CADM(n)/2 + [SCDW(n) + SCDW(n-5) + SCDW(n-10) + SCDW(n-15)] / 8
//! W(n) = SCDW(n) + TIW(n) + CADW(n)/2 + [SCDD(n) + SCDD(n-1) + ... + SCDD(n-4)] / 10
//! D(n) = SCDD(n) + TID(n) + CADD(n)/2 + [SCDH1(n) + SCDH2(n) + SCDH3(n) + SCDH4(n)] / 8

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar::TradingCalendar;
use crate::data::DataBundle;
use crate::error::CalcResult;
use crate::field::Field;
use crate::series::Series;
use crate::signals::{CalcArgs, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    Q,
    M,
    W,
    D,
    /// Adjusted close price, passed through unchanged.
    Close,
}

struct Formula {
    level: Field,
    trend: Field,
    cad: Field,
    smoothing: &'static [(Field, usize)],
    divisor: f64,
}

const Q_FORMULA: Formula = Formula {
    level: Field::Scdq,
    trend: Field::Tiq,
    cad: Field::Cadq,
    smoothing: &[(Field::Scdm, 0), (Field::Scdm, 20), (Field::Scdm, 40)],
    divisor: 6.0,
};

const M_FORMULA: Formula = Formula {
    level: Field::Scdm,
    trend: Field::Tim,
    cad: Field::Cadm,
    smoothing: &[
        (Field::Scdw, 0),
        (Field::Scdw, 5),
        (Field::Scdw, 10),
        (Field::Scdw, 15),
    ],
    divisor: 8.0,
};

const W_FORMULA: Formula = Formula {
    level: Field::Scdw,
    trend: Field::Tiw,
    cad: Field::Cadw,
    smoothing: &[
        (Field::Scdd, 0),
        (Field::Scdd, 1),
        (Field::Scdd, 2),
        (Field::Scdd, 3),
        (Field::Scdd, 4),
    ],
    divisor: 10.0,
};

const D_FORMULA: Formula = Formula {
    level: Field::Scdd,
    trend: Field::Tid,
    cad: Field::Cadd,
    smoothing: &[
        (Field::Scdh1, 0),
        (Field::Scdh2, 0),
        (Field::Scdh3, 0),
        (Field::Scdh4, 0),
    ],
    divisor: 8.0,
};

impl Factor {
    pub const ALL: [Factor; 5] = [Factor::Q, Factor::M, Factor::W, Factor::D, Factor::Close];

    pub fn name(&self) -> &'static str {
        match self {
            Factor::Q => "Q(n)",
            Factor::M => "M(n)",
            Factor::W => "W(n)",
            Factor::D => "D(n)",
            Factor::Close => "Close(n)",
        }
    }

    fn formula(&self) -> Option<&'static Formula> {
        match self {
            Factor::Q => Some(&Q_FORMULA),
            Factor::M => Some(&M_FORMULA),
            Factor::W => Some(&W_FORMULA),
            Factor::D => Some(&D_FORMULA),
            Factor::Close => None,
        }
    }

    /// Deepest internal lookback in trading rows.
    pub const fn lookback(&self) -> usize {
        match self {
            Factor::Q => 40,
            Factor::M => 15,
            Factor::W => 4,
            Factor::D | Factor::Close => 0,
        }
    }

    /// Raw fields the formula reads.
    pub fn fields(&self) -> Vec<Field> {
        let Some(f) = self.formula() else {
            return vec![Field::AdjClosePrice];
        };
        let mut fields = vec![f.level, f.trend, f.cad];
        fields.extend(f.smoothing.iter().map(|(field, _)| *field));
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    /// Evaluate at `args.target_date` shifted by `args.offset`.
    ///
    /// With a bundle source the shared matrices are read directly. With a
    /// store source the factor resolves its own history window and fetches
    /// only the fields it needs.
    pub fn evaluate(&self, args: &CalcArgs<'_>) -> CalcResult<Series> {
        match args.source {
            Source::Bundle(bundle) => self.evaluate_in(bundle, args.target_date, args.offset),
            Source::Store { store, symbols } => {
                let calendar = TradingCalendar::new(store.list_trading_days(None, None)?);
                let effective = calendar.offset_date(args.target_date, args.offset)?;
                let window = calendar.history_window(effective, self.lookback())?;
                let bundle = DataBundle::fetch(store, symbols, window, &self.fields())?;
                self.evaluate_in(&bundle, effective, 0)
            }
        }
    }

    /// Evaluate against a bundle at `date` shifted by `offset` rows.
    pub fn evaluate_in(&self, bundle: &DataBundle, date: NaiveDate, offset: i64) -> CalcResult<Series> {
        let calendar = bundle.calendar();
        let n = calendar.offset_index(calendar.index_of(date)?, offset);

        let Some(f) = self.formula() else {
            return bundle.series_at(Field::AdjClosePrice, n);
        };

        let level = bundle.series_at(f.level, n)?;
        let trend = bundle.series_at(f.trend, n)?;
        let cad = bundle.series_at(f.cad, n)?;
        let smoothing = f
            .smoothing
            .iter()
            .map(|&(field, lag)| bundle.series_at(field, calendar.offset_index(n, -(lag as i64))))
            .collect::<CalcResult<Vec<Series>>>()?;
        let smoothing = Series::sum(&smoothing.iter().collect::<Vec<_>>())?;

        let divisor = f.divisor;
        Series::sum(&[&level, &trend])?
            .zip_with(&cad, |acc, c| acc + c / 2.0)?
            .zip_with(&smoothing, |acc, s| acc + s / divisor)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
