//! Turning merged counts into analysis-ready rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::merge::GlobalStats;

/// Delay ratio per calendar day for one airline, ordered by date.
pub type DailySeries = BTreeMap<NaiveDate, f64>;

/// One `(airline, date)` row of the final table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRecord {
    pub airline: String,
    pub date: NaiveDate,
    /// `delayed_flights / total_flights`, always within `[0, 1]`.
    pub delay_ratio: f64,
}

/// Derives one [`TidyRecord`] per merged group.
///
/// # Errors
///
/// Fails on the first group whose `(year, month, day)` is not a calendar
/// date, or whose flight count is zero. Neither can happen with well-formed
/// input, so both are reported rather than skipped.
pub fn derive_tidy(stats: &GlobalStats) -> Result<Vec<TidyRecord>> {
    stats
        .groups()
        .iter()
        .map(|(key, counts)| {
            let date = NaiveDate::from_ymd_opt(key.year, key.month, key.day)
                .ok_or_else(|| PipelineError::InvalidDate { key: key.clone() })?;
            let delay_ratio = counts
                .ratio()
                .ok_or_else(|| PipelineError::EmptyGroup { key: key.clone() })?;

            Ok(TidyRecord {
                airline: key.airline.clone(),
                date,
                delay_ratio,
            })
        })
        .collect()
}

/// Extracts the date-indexed series of a single airline.
pub fn airline_series(records: &[TidyRecord], airline: &str) -> DailySeries {
    records
        .iter()
        .filter(|r| r.airline == airline)
        .map(|r| (r.date, r.delay_ratio))
        .collect()
}
