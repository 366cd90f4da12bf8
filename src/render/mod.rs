//! Calendar heatmap rendering.
//!
//! [`CalendarRenderer`] is the seam between the pipeline and whatever draws
//! the heatmaps. [`SvgCalendarRenderer`] draws one SVG file per airline with
//! plotters.

pub mod color;
mod svg;

pub use color::{ColorScale, Palette, parse_color};
pub use svg::SvgCalendarRenderer;

use plotters::style::RGBColor;
use std::path::PathBuf;

use crate::config::StyleConfig;
use crate::error::{PipelineError, Result};
use crate::tidy::DailySeries;

/// Draws one heatmap artifact for an airline's daily delay ratios.
pub trait CalendarRenderer {
    /// Returns the location of the produced artifact.
    fn render(&self, airline: &str, series: &DailySeries) -> Result<PathBuf>;
}

/// Cosmetic parameters shared by every heatmap of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapStyle {
    pub edge_color: RGBColor,
    pub line_width: u32,
    pub color_scale: ColorScale,
    pub title_template: String,
}

impl HeatmapStyle {
    pub fn from_config(config: &StyleConfig) -> Result<Self> {
        Ok(HeatmapStyle {
            edge_color: parse_color(&config.edge_color)?,
            line_width: config.line_width,
            color_scale: config.color_scale.parse()?,
            title_template: config.title.clone(),
        })
    }

    pub fn title_for(&self, airline: &str) -> String {
        self.title_template.replace("{airline}", airline)
    }
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        // the default StyleConfig only holds valid values
        HeatmapStyle {
            edge_color: RGBColor(255, 255, 255),
            line_width: 2,
            color_scale: ColorScale {
                palette: Palette::RdYlBu,
                reversed: true,
            },
            title_template: StyleConfig::default().title,
        }
    }
}

pub(crate) fn render_error(airline: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Render {
        airline: airline.to_string(),
        message: err.to_string(),
    }
}
