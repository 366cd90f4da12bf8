//! Row types read from the flights dataset.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Cell values treated as "no value", in addition to an empty cell.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single row deserialized from the flights CSV.
///
/// Only the five columns the pipeline needs are read; any other column in
/// the file is ignored. Every field is optional so that a blank or NA cell
/// becomes `None` and can be excluded later rather than failing the batch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlightRecord {
    #[serde(rename = "YEAR", default, deserialize_with = "na_option")]
    pub year: Option<i32>,
    #[serde(rename = "MONTH", default, deserialize_with = "na_option")]
    pub month: Option<u32>,
    #[serde(rename = "DAY", default, deserialize_with = "na_option")]
    pub day: Option<u32>,
    #[serde(rename = "AIRLINE", default, deserialize_with = "na_option")]
    pub airline: Option<String>,
    #[serde(rename = "ARRIVAL_DELAY", default, deserialize_with = "na_option")]
    pub arrival_delay: Option<f64>,
}

impl FlightRecord {
    /// Builds a fully populated record.
    pub fn new(year: i32, month: u32, day: u32, airline: &str, arrival_delay: f64) -> Self {
        FlightRecord {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            airline: Some(airline.to_string()),
            arrival_delay: Some(arrival_delay),
        }
    }

    /// Returns the group key and delay when every required field is present.
    ///
    /// A NaN delay counts as missing, whatever spelling it was parsed from.
    pub fn complete(&self) -> Option<(GroupKey, f64)> {
        let key = GroupKey {
            year: self.year?,
            month: self.month?,
            day: self.day?,
            airline: self.airline.clone()?,
        };
        let arrival_delay = self.arrival_delay.filter(|d| !d.is_nan())?;
        Some((key, arrival_delay))
    }
}

/// One aggregation bucket: a calendar day for a single airline.
///
/// Ordering is by date then airline, which keeps merged maps and the tidy
/// output stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub airline: String,
}

impl GroupKey {
    pub fn new(year: i32, month: u32, day: u32, airline: &str) -> Self {
        GroupKey {
            year,
            month,
            day,
            airline: airline.to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.year, self.month, self.day, self.airline
        )
    }
}

/// Deserializes a cell as `None` when it is blank or an NA marker, and
/// parses it with `FromStr` otherwise. Unparseable text is an error.
fn na_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let cell = raw.trim();
    if cell.is_empty() || NA_MARKERS.contains(&cell) {
        return Ok(None);
    }

    cell.parse::<T>()
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid value {cell:?}: {e}")))
}
