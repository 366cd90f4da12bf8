//! Drives batches through aggregation, merging, derivation and rendering.
//!
//! Sequential mode reads, aggregates and folds one batch before asking for
//! the next. Concurrent mode aggregates up to `concurrency` batches at once
//! and only merges once every batch has been aggregated and the reader
//! finished cleanly. Both produce the same [`GlobalStats`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::merge::GlobalStats;
use crate::record::FlightRecord;
use crate::render::CalendarRenderer;
use crate::stats::{AggregationParams, PartialStats};
use crate::tidy::{TidyRecord, airline_series};

/// Aggregates and folds batches one at a time on the calling thread.
///
/// Stops at the first failed batch; partial totals are discarded.
pub fn aggregate_sequential<I>(batches: I, params: &AggregationParams) -> Result<GlobalStats>
where
    I: IntoIterator<Item = Result<Vec<FlightRecord>>>,
{
    let mut global = GlobalStats::default();

    for (index, batch) in batches.into_iter().enumerate() {
        let batch = batch?;
        let partial = PartialStats::from_batch(&batch, params);
        debug!(
            batch = index,
            rows = batch.len(),
            groups = partial.len(),
            "Batch aggregated"
        );
        global = global.absorb(partial);
    }

    Ok(global)
}

/// Aggregates up to `concurrency` batches at a time.
///
/// A blocking producer reads batches into a bounded channel, so at most
/// roughly `2 * concurrency` raw batches are alive at once. Partial results
/// stay with their tasks until the final merge.
#[tracing::instrument(skip(batches, params))]
pub async fn aggregate_concurrently<I>(
    batches: I,
    params: Arc<AggregationParams>,
    concurrency: usize,
) -> Result<GlobalStats>
where
    I: IntoIterator<Item = Result<Vec<FlightRecord>>> + Send + 'static,
{
    let concurrency = concurrency.max(1);
    let (tx, mut rx) = mpsc::channel::<Vec<FlightRecord>>(concurrency);

    let producer = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut sent = 0;
        for batch in batches {
            let batch = batch?;
            if tx.blocking_send(batch).is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    });

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = Vec::new();

    while let Some(batch) = rx.recv().await {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;
        let params = Arc::clone(&params);

        tasks.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            PartialStats::from_batch(&batch, &params)
        }));
    }

    let batches_read = producer.await??;
    debug!(batches_read, "Reader finished");

    let mut global = GlobalStats::default();
    for task in tasks {
        global = global.absorb(task.await?);
    }

    Ok(global)
}

/// Runs the aggregation in the mode selected by `concurrency`.
pub async fn aggregate<I>(
    batches: I,
    params: AggregationParams,
    concurrency: usize,
) -> Result<GlobalStats>
where
    I: IntoIterator<Item = Result<Vec<FlightRecord>>> + Send + 'static,
{
    let global = if concurrency <= 1 {
        tokio::task::spawn_blocking(move || aggregate_sequential(batches, &params)).await??
    } else {
        aggregate_concurrently(batches, Arc::new(params), concurrency).await?
    };

    log_summary(&global);
    Ok(global)
}

/// Logs dataset-wide totals and exclusion counts.
pub fn log_summary(global: &GlobalStats) {
    let totals = global.totals();
    let tally = global.tally();
    info!(
        rows = tally.rows,
        outside_interest = tally.outside_interest,
        missing_field = tally.missing_field,
        groups = global.len(),
        total_flights = totals.total_flights,
        delayed_flights = totals.delayed_flights,
        delayed_share = totals.ratio().unwrap_or(0.0),
        "Aggregation complete"
    );
}

/// Renders one heatmap per airline, in the given order.
///
/// Airlines with no rows are skipped with a warning. The first renderer
/// failure aborts the loop.
pub fn render_all<'a, R, A>(
    renderer: &R,
    records: &[TidyRecord],
    airlines: A,
) -> Result<Vec<PathBuf>>
where
    R: CalendarRenderer,
    A: IntoIterator<Item = &'a str>,
{
    let mut written = Vec::new();

    for airline in airlines {
        let series = airline_series(records, airline);
        if series.is_empty() {
            warn!(airline, "No data for airline, skipping heatmap");
            continue;
        }

        info!(airline, days = series.len(), "Rendering heatmap");
        written.push(renderer.render(airline, &series)?);
    }

    Ok(written)
}
