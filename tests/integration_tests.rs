use chrono::NaiveDate;
use flight_delays::error::PipelineError;
use flight_delays::merge::GlobalStats;
use flight_delays::pipeline::{aggregate, aggregate_sequential, render_all};
use flight_delays::reader::BatchReader;
use flight_delays::record::GroupKey;
use flight_delays::render::{HeatmapStyle, SvgCalendarRenderer};
use flight_delays::source::open_records;
use flight_delays::stats::{AggregationParams, DelayCounts};
use flight_delays::tidy::{TidyRecord, derive_tidy};
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/flights_sample.csv")
}

fn counts(total_flights: u64, delayed_flights: u64) -> DelayCounts {
    DelayCounts {
        total_flights,
        delayed_flights,
    }
}

fn run_fixture(batch_size: usize) -> GlobalStats {
    let reader = open_records(&fixture(), batch_size).expect("Failed to open fixture");
    aggregate_sequential(reader, &AggregationParams::default()).expect("Failed to aggregate")
}

#[test]
fn test_fixture_totals() {
    let global = run_fixture(100_000);

    assert_eq!(global.len(), 6);
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "AA")), Some(counts(3, 1)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "US")), Some(counts(2, 1)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "DL")), Some(counts(2, 0)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 2, "UA")), Some(counts(3, 1)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 2, "AA")), Some(counts(1, 1)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 2, "DL")), Some(counts(1, 1)));
    assert_eq!(global.totals(), counts(12, 5));

    let tally = global.tally();
    assert_eq!(tally.rows, 18);
    assert_eq!(tally.outside_interest, 3);
    assert_eq!(tally.missing_field, 3);
}

#[test]
fn test_fixture_batch_size_independence() {
    let whole = run_fixture(100_000);
    for batch_size in [1, 2, 4, 7, 17] {
        assert_eq!(run_fixture(batch_size), whole, "batch size {batch_size}");
    }
}

#[test]
fn test_two_batch_round_trip() {
    let text = "YEAR,MONTH,DAY,AIRLINE,ARRIVAL_DELAY\n\
                2015,1,1,AA,5\n\
                2015,1,1,AA,15\n\
                2015,1,1,DL,20\n";
    let reader = BatchReader::new(text.as_bytes(), 2).unwrap();
    let global = aggregate_sequential(reader, &AggregationParams::default()).unwrap();

    assert_eq!(global.len(), 2);
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "AA")), Some(counts(2, 1)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "DL")), Some(counts(1, 1)));

    let date = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let tidy = derive_tidy(&global).unwrap();
    assert_eq!(
        tidy,
        vec![
            TidyRecord {
                airline: "AA".to_string(),
                date,
                delay_ratio: 0.5,
            },
            TidyRecord {
                airline: "DL".to_string(),
                date,
                delay_ratio: 1.0,
            },
        ]
    );
}

#[test]
fn test_invalid_date_surfaces_from_derivation() {
    let text = "YEAR,MONTH,DAY,AIRLINE,ARRIVAL_DELAY\n\
                2015,2,28,AA,5\n\
                2015,2,30,AA,15\n";
    let reader = BatchReader::new(text.as_bytes(), 10).unwrap();
    let global = aggregate_sequential(reader, &AggregationParams::default()).unwrap();

    match derive_tidy(&global) {
        Err(PipelineError::InvalidDate { key }) => {
            assert_eq!(key, GroupKey::new(2015, 2, 30, "AA"));
        }
        other => panic!("expected InvalidDate, got {other:?}"),
    }
}

#[test]
fn test_malformed_batch_aborts_run() {
    let text = "YEAR,MONTH,DAY,AIRLINE,ARRIVAL_DELAY\n\
                2015,1,1,AA,5\n\
                2015,1,1,AA,five\n";
    let reader = BatchReader::new(text.as_bytes(), 1).unwrap();
    let result = aggregate_sequential(reader, &AggregationParams::default());

    assert!(matches!(result, Err(PipelineError::DataRead { batch: 1, .. })));
}

#[test]
fn test_irregular_rows_are_excluded_not_fatal() {
    let text = " YEAR,MONTH,DAY,AIRLINE, ARRIVAL_DELAY,CANCELLED\n\
                2015,1,1,AA,5,0\n\
                2015,1,1,AA,-nan,0\n\
                2015,1,1,AA,NAN,0\n\
                2015,1,1,AA\n\
                2015,1,1,DL,25,0\n";
    let reader = BatchReader::new(text.as_bytes(), 2).unwrap();
    let global = aggregate_sequential(reader, &AggregationParams::default()).unwrap();

    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "AA")), Some(counts(1, 0)));
    assert_eq!(global.get(&GroupKey::new(2015, 1, 1, "DL")), Some(counts(1, 1)));

    let tally = global.tally();
    assert_eq!(tally.rows, 5);
    assert_eq!(tally.missing_field, 3);
    assert_eq!(tally.retained(), 2);
}

#[tokio::test]
async fn test_concurrent_run_matches_sequential() {
    let expected = run_fixture(3);

    let reader = open_records(&fixture(), 3).unwrap();
    let global = aggregate(reader, AggregationParams::default(), 4)
        .await
        .unwrap();

    assert_eq!(global, expected);
}

#[test]
fn test_full_pipeline_renders_heatmaps() {
    let dir = std::env::temp_dir().join("flight_delays_test_full_pipeline");
    let _ = std::fs::remove_dir_all(&dir);

    let params = AggregationParams::default();
    let reader = open_records(&fixture(), 5).unwrap();
    let global = aggregate_sequential(reader, &params).unwrap();
    let tidy = derive_tidy(&global).unwrap();
    assert!(tidy.iter().all(|r| (0.0..=1.0).contains(&r.delay_ratio)));

    let renderer = SvgCalendarRenderer::new(&dir, HeatmapStyle::default());
    let written = render_all(&renderer, &tidy, params.airlines()).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["AA.svg", "DL.svg", "UA.svg", "US.svg"]);
    assert!(written.iter().all(|p| p.exists()));

    std::fs::remove_dir_all(&dir).unwrap();
}
