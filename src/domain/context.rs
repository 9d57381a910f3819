//! Immutable per-run context.
//!
//! Computed once from the observed date span and handed to every stage, so no
//! component reads "current run" values from anywhere else.

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::CarryOverSource;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Earliest observed date in the file.
    pub first_observed: NaiveDate,
    /// Grid start: one day before `first_observed` (the seed day).
    pub window_start: NaiveDate,
    /// Grid end: latest observed date.
    pub window_end: NaiveDate,
    /// Year and month of `window_end`; the only month emitted.
    pub target_year: i32,
    pub target_month: u32,
    /// Last calendar day of the month preceding `first_observed`.
    pub carry_over_date: NaiveDate,
    pub carry_over_source: CarryOverSource,
}

impl RunContext {
    pub fn from_span(
        first_observed: NaiveDate,
        last_observed: NaiveDate,
        carry_over_source: CarryOverSource,
    ) -> Result<Self, AppError> {
        if last_observed < first_observed {
            return Err(AppError::malformed(format!(
                "Observed date span is inverted: {first_observed} > {last_observed}."
            )));
        }

        Ok(Self {
            first_observed,
            window_start: first_observed - Duration::days(1),
            window_end: last_observed,
            target_year: last_observed.year(),
            target_month: last_observed.month(),
            carry_over_date: last_day_of_previous_month(first_observed)?,
            carry_over_source,
        })
    }

    /// Build the context from the dates of every observation in the month.
    pub fn from_dates<I>(dates: I, carry_over_source: CarryOverSource) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut span: Option<(NaiveDate, NaiveDate)> = None;
        for date in dates {
            span = Some(match span {
                None => (date, date),
                Some((lo, hi)) => (lo.min(date), hi.max(date)),
            });
        }

        let (lo, hi) =
            span.ok_or_else(|| AppError::malformed("No observations in the source file; nothing to transform."))?;
        Self::from_span(lo, hi, carry_over_source)
    }

    pub fn in_target_month(&self, date: NaiveDate) -> bool {
        date.year() == self.target_year && date.month() == self.target_month
    }

    /// Number of calendar days in the grid window (inclusive).
    pub fn window_days(&self) -> usize {
        ((self.window_end - self.window_start).num_days() + 1) as usize
    }

    /// Lower-case `mmmYYYY` label of the target month, e.g. `aug2025`.
    pub fn target_label(&self) -> String {
        NaiveDate::from_ymd_opt(self.target_year, self.target_month, 1)
            .map(|d| d.format("%b%Y").to_string().to_lowercase())
            .unwrap_or_default()
    }
}

/// Last calendar day of the month before `date`.
pub fn last_day_of_previous_month(date: NaiveDate) -> Result<NaiveDate, AppError> {
    date.with_day(1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(|| AppError::malformed(format!("No previous month exists for {date}.")))
}
