//! Batch reader over a flights CSV stream.
//!
//! Yields bounded batches so that at most `batch_size` raw records are held
//! in memory at a time.

use std::io::Read;

use csv::StringRecord;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::FlightRecord;

/// Columns that must be present in the header row.
pub const REQUIRED_COLUMNS: &[&str] = &["YEAR", "MONTH", "DAY", "AIRLINE", "ARRIVAL_DELAY"];

/// Upper bound on the initial allocation of a batch buffer.
const MAX_PREALLOC: usize = 8192;

/// Iterator of record batches read from a CSV stream.
///
/// A read or parse failure is returned once and ends the iteration.
pub struct BatchReader<R: Read> {
    rdr: csv::Reader<R>,
    headers: StringRecord,
    row: StringRecord,
    batch_size: usize,
    batches_read: usize,
    finished: bool,
}

impl<R: Read> BatchReader<R> {
    /// Wraps `input`, validating the header row up front.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for a zero batch size,
    /// [`PipelineError::DataRead`] if the header cannot be read and
    /// [`PipelineError::MissingColumns`] if required columns are absent.
    pub fn new(input: R, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }

        // Short rows deserialize with their absent cells as `None`.
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(input);
        let headers = rdr
            .headers()
            .map_err(|source| PipelineError::DataRead { batch: 0, source })?
            .clone();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns { columns: missing });
        }

        debug!(batch_size, columns = headers.len(), "Opened flight records");

        Ok(BatchReader {
            rdr,
            headers,
            row: StringRecord::new(),
            batch_size,
            batches_read: 0,
            finished: false,
        })
    }

    /// Number of batches handed out so far.
    pub fn batches_read(&self) -> usize {
        self.batches_read
    }

    /// Reads the next row, padding a short row with empty cells so that
    /// every column, ignored or not, has a value to deserialize.
    fn next_record(&mut self) -> Option<csv::Result<FlightRecord>> {
        match self.rdr.read_record(&mut self.row) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => return Some(Err(e)),
        }
        while self.row.len() < self.headers.len() {
            self.row.push_field("");
        }
        Some(self.row.deserialize(Some(&self.headers)))
    }
}

impl<R: Read> Iterator for BatchReader<R> {
    type Item = Result<Vec<FlightRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size.min(MAX_PREALLOC));
        while batch.len() < self.batch_size {
            match self.next_record() {
                Some(Ok(record)) => batch.push(record),
                Some(Err(source)) => {
                    self.finished = true;
                    return Some(Err(PipelineError::DataRead {
                        batch: self.batches_read,
                        source,
                    }));
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            return None;
        }

        self.batches_read += 1;
        Some(Ok(batch))
    }
}
