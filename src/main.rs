//! CLI entry point for the flight delay heatmap tool.
//!
//! Provides subcommands for rendering per-airline calendar heatmaps,
//! writing the tidy per-day delay table, and logging dataset totals.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use flight_delays::{
    config::PipelineConfig,
    merge::GlobalStats,
    output::{TableFormat, log_preview, sort_records, write_table},
    pipeline::{aggregate, render_all},
    render::SvgCalendarRenderer,
    source::{DataSource, open_records},
    tidy::{TidyRecord, derive_tidy},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Rows of the tidy table logged before writing.
const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "flight_delays")]
#[command(about = "Per-day airline delay statistics and calendar heatmaps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one calendar heatmap per airline
    Heatmap {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Directory to write SVG heatmaps to (overrides the config file)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write the tidy table to this file
        #[arg(long)]
        tidy_output: Option<PathBuf>,

        /// Format of the tidy table
        #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
        format: TableFormat,
    },
    /// Write the tidy (airline, date, delay_ratio) table
    Tidy {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// File to write the table to
        #[arg(short, long, default_value = "delays.csv")]
        output: PathBuf,

        /// Format of the table
        #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
        format: TableFormat,
    },
    /// Aggregate the dataset and log overall totals
    Summary {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Path to a CSV (optionally gzip-compressed) or an http(s) URL
    #[arg(value_name = "FILE_OR_URL")]
    source: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Rows per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Comma-separated airline codes, e.g. "AA,DL"
    #[arg(short, long, value_delimiter = ',')]
    airlines: Option<Vec<String>>,

    /// Arrival delay in minutes a flight must exceed to count as delayed
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Number of batches aggregated in parallel (1 = sequential)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Where remote sources are downloaded to
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Keep a downloaded source on disk after the run
    #[arg(long)]
    keep_download: bool,
}

impl PipelineArgs {
    /// Loads the config file (or defaults) and applies command-line overrides.
    fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(airlines) = &self.airlines {
            config.airlines = airlines.clone();
        }
        if let Some(threshold) = self.threshold {
            config.delay_threshold = threshold;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Keep the guard alive so buffered JSON logs are flushed on exit
    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        error!(error = %e, "Run failed");
        return Err(e);
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/flight_delays.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("flight_delays.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Heatmap {
            pipeline,
            output_dir,
            tidy_output,
            format,
        } => {
            let mut config = pipeline.resolve_config()?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            let global = aggregate_source(&pipeline, &config).await?;
            let tidy = tidy_table(&global)?;

            if let Some(path) = tidy_output {
                write_table(&path, &tidy, format)?;
                info!(path = %path.display(), "Tidy table written");
            }

            let params = config.aggregation_params()?;
            let renderer = SvgCalendarRenderer::new(&config.output_dir, config.heatmap_style()?);
            let written = render_all(&renderer, &tidy, params.airlines())?;

            info!(
                heatmaps = written.len(),
                output_dir = %config.output_dir.display(),
                "Finished rendering heatmaps"
            );
        }
        Commands::Tidy {
            pipeline,
            output,
            format,
        } => {
            let config = pipeline.resolve_config()?;
            let global = aggregate_source(&pipeline, &config).await?;
            let tidy = tidy_table(&global)?;

            write_table(&output, &tidy, format)?;
            info!(path = %output.display(), rows = tidy.len(), "Tidy table written");
        }
        Commands::Summary { pipeline } => {
            let config = pipeline.resolve_config()?;
            aggregate_source(&pipeline, &config).await?;
        }
    }

    Ok(())
}

/// Fetches the source if needed and runs it through aggregation and merge.
#[tracing::instrument(skip_all, fields(source = %args.source))]
async fn aggregate_source(args: &PipelineArgs, config: &PipelineConfig) -> Result<GlobalStats> {
    let download_dir = args
        .download_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("flight_delays"));
    let fetched = DataSource::parse(&args.source).fetch(&download_dir).await?;
    let path = fetched.path().to_path_buf();

    info!(
        path = %path.display(),
        batch_size = config.batch_size,
        concurrency = config.concurrency,
        "Reading flight records"
    );
    let result = aggregate_path(&path, config).await;

    if args.keep_download && fetched.is_download() {
        info!(path = %path.display(), "Keeping downloaded flight records");
    } else {
        fetched.discard().await;
    }

    result
}

async fn aggregate_path(path: &Path, config: &PipelineConfig) -> Result<GlobalStats> {
    let reader = open_records(path, config.batch_size)?;
    let global = aggregate(reader, config.aggregation_params()?, config.concurrency).await?;
    Ok(global)
}

/// Derives the tidy table, sorted for stable output, and logs a preview.
fn tidy_table(global: &GlobalStats) -> Result<Vec<TidyRecord>> {
    let mut tidy = derive_tidy(global)?;
    sort_records(&mut tidy);
    log_preview(&tidy, PREVIEW_ROWS);
    Ok(tidy)
}
