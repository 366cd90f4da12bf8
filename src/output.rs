//! Output formatting and persistence for the tidy delay table.
//!
//! Supports a logged preview, CSV and JSON files.

use anyhow::Result;
use clap::ValueEnum;
use tracing::{debug, info};

use crate::tidy::TidyRecord;
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File format of the tidy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TableFormat {
    #[default]
    Csv,
    Json,
}

/// Logs the first `rows` records of the table.
pub fn log_preview(records: &[TidyRecord], rows: usize) {
    for r in records.iter().take(rows) {
        info!(airline = %r.airline, date = %r.date, delay_ratio = r.delay_ratio, "Tidy row");
    }
    if records.len() > rows {
        debug!(remaining = records.len() - rows, "Preview truncated");
    }
}

/// Sorts records by airline then date so written files are stable.
pub fn sort_records(records: &mut [TidyRecord]) {
    records.sort_by(|a, b| a.airline.cmp(&b.airline).then(a.date.cmp(&b.date)));
}

/// Writes the table to `path` in the requested format, replacing any
/// existing file.
pub fn write_table(path: &Path, records: &[TidyRecord], format: TableFormat) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), ?format, "Writing tidy table");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        TableFormat::Csv => write_csv(path, records),
        TableFormat::Json => write_json(path, records),
    }
}

fn write_csv(path: &Path, records: &[TidyRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

fn write_json(path: &Path, records: &[TidyRecord]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}
