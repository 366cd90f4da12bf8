//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every key is optional and falls back to
//! the defaults below:
//! ```json
//! {
//!   "batch_size": 100000,
//!   "airlines": ["AA", "DL", "UA", "US"],
//!   "delay_threshold": 10.0,
//!   "concurrency": 1,
//!   "output_dir": "heatmaps",
//!   "style": {
//!     "edge_color": "white",
//!     "line_width": 2,
//!     "color_scale": "RdYlBu_r",
//!     "title": "Flight delay heatmap - airline {airline}"
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::render::HeatmapStyle;
use crate::stats::{AggregationParams, DEFAULT_AIRLINES, DEFAULT_DELAY_THRESHOLD};

/// Rows per batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub airlines: Vec<String>,
    pub delay_threshold: f64,
    /// Number of batches aggregated at once. `1` is strictly sequential.
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub style: StyleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            airlines: DEFAULT_AIRLINES.iter().map(|a| a.to_string()).collect(),
            delay_threshold: DEFAULT_DELAY_THRESHOLD,
            concurrency: 1,
            output_dir: PathBuf::from("heatmaps"),
            style: StyleConfig::default(),
        }
    }
}

/// Cosmetic heatmap settings, kept as plain strings until validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub edge_color: String,
    pub line_width: u32,
    pub color_scale: String,
    /// `{airline}` is replaced by the airline code.
    pub title: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            edge_color: "white".to_string(),
            line_width: 2,
            color_scale: "RdYlBu_r".to_string(),
            title: "Flight delay heatmap - airline {airline}".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: PipelineConfig =
            serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        self.aggregation_params()?;
        self.heatmap_style()?;
        Ok(())
    }

    pub fn aggregation_params(&self) -> std::result::Result<AggregationParams, PipelineError> {
        AggregationParams::new(self.airlines.iter().cloned(), self.delay_threshold)
    }

    pub fn heatmap_style(&self) -> std::result::Result<HeatmapStyle, PipelineError> {
        HeatmapStyle::from_config(&self.style)
    }
}
