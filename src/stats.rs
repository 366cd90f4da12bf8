//! Per-batch sufficient statistics.
//!
//! A batch of raw records is reduced to `(total, delayed)` counts per
//! [`GroupKey`]. The counts are exact and additive, so partial results from
//! any number of batches can be merged later without loss.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PipelineError, Result};
use crate::record::{FlightRecord, GroupKey};

/// Airlines analysed when no configuration overrides them.
pub const DEFAULT_AIRLINES: &[&str] = &["AA", "DL", "UA", "US"];

/// Arrival delay in minutes a flight must strictly exceed to count as delayed.
pub const DEFAULT_DELAY_THRESHOLD: f64 = 10.0;

/// Fixed inputs to the aggregator: which airlines to keep and the delay cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationParams {
    airlines: BTreeSet<String>,
    delay_threshold: f64,
}

impl AggregationParams {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `airlines` is empty, a code is
    /// not ASCII alphanumeric, or the threshold is not a finite number.
    pub fn new<I, S>(airlines: I, delay_threshold: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let airlines: BTreeSet<String> = airlines
            .into_iter()
            .map(|a| a.into().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        if airlines.is_empty() {
            return Err(PipelineError::Config(
                "at least one airline code is required".to_string(),
            ));
        }
        // Codes name the heatmap files, so they must be plain identifiers.
        if let Some(bad) = airlines
            .iter()
            .find(|a| !a.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(PipelineError::Config(format!(
                "airline code {bad:?} must be ASCII letters and digits"
            )));
        }
        if !delay_threshold.is_finite() {
            return Err(PipelineError::Config(format!(
                "delay threshold must be finite, got {delay_threshold}"
            )));
        }

        Ok(AggregationParams {
            airlines,
            delay_threshold,
        })
    }

    pub fn airlines(&self) -> impl Iterator<Item = &str> {
        self.airlines.iter().map(String::as_str)
    }

    pub fn delay_threshold(&self) -> f64 {
        self.delay_threshold
    }

    pub fn is_of_interest(&self, airline: Option<&str>) -> bool {
        airline.is_some_and(|a| self.airlines.contains(a))
    }

    pub fn is_delayed(&self, arrival_delay: f64) -> bool {
        arrival_delay > self.delay_threshold
    }
}

impl Default for AggregationParams {
    fn default() -> Self {
        AggregationParams {
            airlines: DEFAULT_AIRLINES.iter().map(|a| a.to_string()).collect(),
            delay_threshold: DEFAULT_DELAY_THRESHOLD,
        }
    }
}

/// Flight counts for one group. `delayed_flights <= total_flights` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayCounts {
    pub total_flights: u64,
    pub delayed_flights: u64,
}

impl DelayCounts {
    pub fn record(&mut self, delayed: bool) {
        self.total_flights += 1;
        if delayed {
            self.delayed_flights += 1;
        }
    }

    pub fn add(&mut self, other: DelayCounts) {
        self.total_flights += other.total_flights;
        self.delayed_flights += other.delayed_flights;
        debug_assert!(self.delayed_flights <= self.total_flights);
    }

    /// Share of delayed flights, or `None` when there are no flights.
    pub fn ratio(&self) -> Option<f64> {
        if self.total_flights == 0 {
            None
        } else {
            Some(self.delayed_flights as f64 / self.total_flights as f64)
        }
    }
}

/// How many rows were seen and why rows were left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionTally {
    pub rows: u64,
    pub outside_interest: u64,
    pub missing_field: u64,
}

impl ExclusionTally {
    pub fn add(&mut self, other: ExclusionTally) {
        self.rows += other.rows;
        self.outside_interest += other.outside_interest;
        self.missing_field += other.missing_field;
    }

    pub fn retained(&self) -> u64 {
        self.rows - self.outside_interest - self.missing_field
    }
}

/// Sufficient statistics for a single batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialStats {
    pub(crate) groups: BTreeMap<GroupKey, DelayCounts>,
    pub(crate) tally: ExclusionTally,
}

impl PartialStats {
    /// Reduces a batch to per-group counts.
    ///
    /// Records outside the airline interest set are dropped first, then
    /// records missing any required field. Both are silent exclusions,
    /// counted separately in the tally.
    pub fn from_batch(batch: &[FlightRecord], params: &AggregationParams) -> Self {
        let mut s = PartialStats::default();
        s.tally.rows = batch.len() as u64;

        for record in batch {
            if !params.is_of_interest(record.airline.as_deref()) {
                s.tally.outside_interest += 1;
                continue;
            }

            let Some((key, arrival_delay)) = record.complete() else {
                s.tally.missing_field += 1;
                continue;
            };

            s.groups
                .entry(key)
                .or_default()
                .record(params.is_delayed(arrival_delay));
        }

        s
    }

    pub fn groups(&self) -> &BTreeMap<GroupKey, DelayCounts> {
        &self.groups
    }

    pub fn get(&self, key: &GroupKey) -> Option<DelayCounts> {
        self.groups.get(key).copied()
    }

    pub fn tally(&self) -> ExclusionTally {
        self.tally
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
