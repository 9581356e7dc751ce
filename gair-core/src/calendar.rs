//! Trading-calendar resolver.
//!
//! All factor and signal offsets live in trading-day index space, not calendar
//! days. Offsets that run past either end of the sequence saturate at the
//! boundary instead of failing, so requests near the start of history degrade
//! to the earliest available row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};

/// Ascending, deduplicated sequence of trading days.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Build a calendar from arbitrary input; sorts and removes duplicates.
    pub fn new(mut days: Vec<NaiveDate>) -> Self {
        days.sort_unstable();
        days.dedup();
        Self { days }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// Date at a row position.
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.days.get(index).copied()
    }

    /// Position of `date` in the sequence.
    pub fn index_of(&self, date: NaiveDate) -> CalcResult<usize> {
        self.days
            .binary_search(&date)
            .map_err(|_| CalcError::DateNotFound { date })
    }

    /// Shift a row index by a signed offset, clamped to `[0, len - 1]`.
    pub fn offset_index(&self, index: usize, offset: i64) -> usize {
        if self.days.is_empty() {
            return 0;
        }
        let last = (self.days.len() - 1) as i64;
        (index as i64).saturating_add(offset).clamp(0, last) as usize
    }

    /// Resolve `date` shifted by `offset` trading days (clamped).
    pub fn offset_date(&self, date: NaiveDate, offset: i64) -> CalcResult<NaiveDate> {
        let index = self.index_of(date)?;
        Ok(self.days[self.offset_index(index, offset)])
    }

    /// The `periods + 1` trading days ending at `date`, clipped at the start.
    pub fn history_window(&self, date: NaiveDate, periods: usize) -> CalcResult<&[NaiveDate]> {
        let end = self.index_of(date)?;
        let start = end.saturating_sub(periods);
        Ok(&self.days[start..=end])
    }

    /// Contiguous days from `periods` rows before `start` through `end`.
    pub fn span(&self, start: NaiveDate, end: NaiveDate, periods: usize) -> CalcResult<&[NaiveDate]> {
        let first = self.index_of(start)?;
        let last = self.index_of(end)?;
        let (first, last) = if first <= last { (first, last) } else { (last, first) };
        Ok(&self.days[first.saturating_sub(periods)..=last])
    }

    /// Days within `[start, end]`, either bound optional.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[NaiveDate] {
        let lo = start.map_or(0, |s| self.days.partition_point(|d| *d < s));
        let hi = end.map_or(self.days.len(), |e| self.days.partition_point(|d| *d <= e));
        if lo >= hi {
            &[]
        } else {
            &self.days[lo..hi]
        }
    }
}

impl From<Vec<NaiveDate>> for TradingCalendar {
    fn from(days: Vec<NaiveDate>) -> Self {
        Self::new(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn weekdays() -> TradingCalendar {
        // Jan 2024 weekdays 2..=12, with the weekend of 6/7 missing
        TradingCalendar::new(vec![d(2), d(3), d(4), d(5), d(8), d(9), d(10), d(11), d(12)])
    }

    #[test]
    fn new_sorts_and_dedups() {
        let cal = TradingCalendar::new(vec![d(5), d(2), d(3), d(2)]);
        assert_eq!(cal.days(), &[d(2), d(3), d(5)]);
    }

    #[test]
    fn index_of_finds_and_rejects() {
        let cal = weekdays();
        assert_eq!(cal.index_of(d(8)).unwrap(), 4);
        let err = cal.index_of(d(6)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn offset_skips_non_trading_days() {
        let cal = weekdays();
        assert_eq!(cal.offset_date(d(8), -1).unwrap(), d(5));
        assert_eq!(cal.offset_date(d(5), 1).unwrap(), d(8));
    }

    #[test]
    fn offset_clamps_at_both_ends() {
        let cal = weekdays();
        assert_eq!(cal.offset_date(d(2), -5).unwrap(), d(2));
        assert_eq!(cal.offset_date(d(11), 10).unwrap(), d(12));
        assert_eq!(cal.offset_index(0, i64::MIN), 0);
    }

    #[test]
    fn history_window_includes_target() {
        let cal = weekdays();
        assert_eq!(cal.history_window(d(9), 2).unwrap(), &[d(5), d(8), d(9)]);
        // Clipped when history is short
        assert_eq!(cal.history_window(d(3), 10).unwrap(), &[d(2), d(3)]);
    }

    #[test]
    fn span_covers_lookback_through_end() {
        let cal = weekdays();
        assert_eq!(cal.span(d(8), d(10), 1).unwrap(), &[d(5), d(8), d(9), d(10)]);
    }

    #[test]
    fn between_respects_optional_bounds() {
        let cal = weekdays();
        assert_eq!(cal.between(Some(d(6)), Some(d(9))), &[d(8), d(9)]);
        assert_eq!(cal.between(None, Some(d(3))), &[d(2), d(3)]);
        assert_eq!(cal.between(Some(d(13)), None), &[] as &[NaiveDate]);
    }
}
