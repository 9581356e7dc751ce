//! Per-symbol value vector for one (formula, date) pair.
//!
//! A `Series` carries one `f64` per request symbol, in the column order of the
//! bundle it was computed from. Missing values are `f64::NAN` and propagate
//! through arithmetic; comparisons against NaN are false.

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    values: Vec<f64>,
}

impl Series {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn filled(len: usize, value: f64) -> Self {
        Self {
            values: vec![value; len],
        }
    }

    /// A series with every cell missing.
    pub fn missing(len: usize) -> Self {
        Self::filled(len, f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Fail unless the series has exactly `expected` values.
    pub fn ensure_len(&self, expected: usize) -> CalcResult<()> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(CalcError::LengthMismatch {
                expected,
                actual: self.values.len(),
            })
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        Series::new(self.values.iter().map(|&v| f(v)).collect())
    }

    /// Element-wise combination of two equally long series.
    pub fn zip_with(&self, other: &Series, f: impl Fn(f64, f64) -> f64) -> CalcResult<Series> {
        other.ensure_len(self.len())?;
        Ok(Series::new(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        ))
    }

    /// Left-to-right element-wise sum. The fold order is fixed so that two
    /// evaluations over the same inputs agree bit for bit.
    pub fn sum(parts: &[&Series]) -> CalcResult<Series> {
        let Some((head, rest)) = parts.split_first() else {
            return Err(CalcError::LengthMismatch {
                expected: 1,
                actual: 0,
            });
        };
        let mut acc = (*head).clone();
        for part in rest {
            part.ensure_len(acc.len())?;
            for (a, b) in acc.values.iter_mut().zip(&part.values) {
                *a += *b;
            }
        }
        Ok(acc)
    }

    /// Replace `-0.0` with `0.0`.
    pub fn normalize_zero(mut self) -> Series {
        for v in &mut self.values {
            *v = normalize_zero(*v);
        }
        self
    }

    /// Equality that treats NaN cells as equal to each other.
    pub fn same_values(&self, other: &Series) -> bool {
        self.len() == other.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()))
    }
}

impl From<Vec<f64>> for Series {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f64> for Series {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Map `-0.0` to `0.0`, leaving every other value untouched.
pub fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}
