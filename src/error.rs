//! Error taxonomy for the delay pipeline.
//!
//! Per-record exclusions (off-interest airlines, missing fields) are not
//! errors and never show up here; they are counted in
//! [`ExclusionTally`](crate::stats::ExclusionTally) instead.

use crate::record::GroupKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A batch could not be read or parsed. Fatal: global totals are
    /// meaningless without every batch.
    #[error("failed to read batch {batch}: {source}")]
    DataRead {
        batch: usize,
        #[source]
        source: csv::Error,
    },

    /// The header row lacks columns the pipeline needs.
    #[error("flight records are missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("failed to open flight records: {0}")]
    Io(#[from] std::io::Error),

    /// The `(year, month, day)` of a group is not a calendar date.
    #[error("group {key} does not form a valid calendar date")]
    InvalidDate { key: GroupKey },

    /// A group with zero flights reached the metric deriver.
    #[error("group {key} has no flights; refusing to compute 0/0")]
    EmptyGroup { key: GroupKey },

    #[error("aggregation worker failed: {0}")]
    Worker(String),

    #[error("failed to render heatmap for {airline}: {message}")]
    Render { airline: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Worker(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
