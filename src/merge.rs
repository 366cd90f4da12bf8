//! Folding per-batch statistics into dataset-wide totals.
//!
//! Merging is an element-wise sum keyed by [`GroupKey`], so it is
//! commutative and associative: the result does not depend on batch order
//! or on how the dataset was split into batches.

use std::collections::BTreeMap;

use crate::record::GroupKey;
use crate::stats::{DelayCounts, ExclusionTally, PartialStats};

/// Exact per-group counts over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalStats {
    groups: BTreeMap<GroupKey, DelayCounts>,
    tally: ExclusionTally,
}

impl GlobalStats {
    /// Adds one batch's counts and returns the updated accumulator.
    ///
    /// A key missing from `partial` is left untouched; a key seen for the
    /// first time starts from zero.
    pub fn absorb(mut self, partial: PartialStats) -> Self {
        for (key, counts) in partial.groups {
            self.groups.entry(key).or_default().add(counts);
        }
        self.tally.add(partial.tally);
        self
    }

    /// Merges any collection of partial results in one reduction.
    pub fn merge_all<I>(partials: I) -> Self
    where
        I: IntoIterator<Item = PartialStats>,
    {
        partials
            .into_iter()
            .fold(GlobalStats::default(), GlobalStats::absorb)
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

    /// Flight counts summed over every group.
    pub fn totals(&self) -> DelayCounts {
        let mut total = DelayCounts::default();
        for counts in self.groups.values() {
            total.add(*counts);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FlightRecord;
    use crate::stats::AggregationParams;

    fn dataset() -> Vec<FlightRecord> {
        vec![
            FlightRecord::new(2015, 1, 1, "AA", 5.0),
            FlightRecord::new(2015, 1, 1, "AA", 15.0),
            FlightRecord::new(2015, 1, 1, "DL", 20.0),
            FlightRecord::new(2015, 1, 2, "UA", -1.0),
            FlightRecord::new(2015, 1, 2, "UA", 45.0),
            FlightRecord::new(2015, 1, 2, "WN", 45.0),
            FlightRecord::new(2015, 1, 1, "AA", 11.0),
            FlightRecord::new(2015, 1, 3, "US", 10.0),
        ]
    }

    fn merged_with_batch_size(records: &[FlightRecord], size: usize) -> GlobalStats {
        let params = AggregationParams::default();
        GlobalStats::merge_all(
            records
                .chunks(size)
                .map(|chunk| PartialStats::from_batch(chunk, &params)),
        )
    }

    #[test]
    fn test_batch_size_does_not_change_result() {
        let records = dataset();
        let whole = merged_with_batch_size(&records, records.len());

        for size in 1..records.len() {
            assert_eq!(merged_with_batch_size(&records, size), whole, "size {size}");
        }
    }

    #[test]
    fn test_batch_order_does_not_change_result() {
        let params = AggregationParams::default();
        let records = dataset();
        let partials: Vec<PartialStats> = records
            .chunks(3)
            .map(|chunk| PartialStats::from_batch(chunk, &params))
            .collect();

        let forward = GlobalStats::merge_all(partials.clone());
        let backward = GlobalStats::merge_all(partials.into_iter().rev());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_counts_are_additive_across_batches() {
        let params = AggregationParams::default();
        let first = PartialStats::from_batch(
            &[
                FlightRecord::new(2015, 1, 1, "AA", 5.0),
                FlightRecord::new(2015, 1, 1, "AA", 15.0),
            ],
            &params,
        );
        let second = PartialStats::from_batch(
            &[
                FlightRecord::new(2015, 1, 1, "AA", 25.0),
                FlightRecord::new(2015, 1, 1, "DL", 20.0),
            ],
            &params,
        );

        let global = GlobalStats::default().absorb(first).absorb(second);

        assert_eq!(
            global.get(&GroupKey::new(2015, 1, 1, "AA")),
            Some(DelayCounts {
                total_flights: 3,
                delayed_flights: 2
            })
        );
        // present only in the second batch
        assert_eq!(
            global.get(&GroupKey::new(2015, 1, 1, "DL")),
            Some(DelayCounts {
                total_flights: 1,
                delayed_flights: 1
            })
        );
    }

    #[test]
    fn test_tally_and_totals() {
        let global = merged_with_batch_size(&dataset(), 2);

        assert_eq!(global.tally().rows, 8);
        assert_eq!(global.tally().outside_interest, 1);
        assert_eq!(global.tally().retained(), 7);
        assert_eq!(
            global.totals(),
            DelayCounts {
                total_flights: 7,
                delayed_flights: 4
            }
        );
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let global = GlobalStats::merge_all(Vec::new());
        assert!(global.is_empty());
        assert_eq!(global.totals(), DelayCounts::default());
    }
}
