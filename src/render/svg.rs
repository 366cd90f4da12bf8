use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

use super::{CalendarRenderer, HeatmapStyle, render_error};
use crate::error::Result;
use crate::tidy::DailySeries;

const CELL: i32 = 16;
const LEFT: i32 = 48;
const TOP: i32 = 48;
const RIGHT: i32 = 24;
/// Year label plus month labels above each grid.
const PANEL_HEADER: i32 = 32;
const PANEL_GAP: i32 = 16;
const WEEK_COLUMNS: i32 = 54;
const LEGEND_HEIGHT: i32 = 56;
const LEGEND_STEPS: i32 = 10;

const MISSING_DAY: RGBColor = RGBColor(245, 245, 245);
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

type DrawResult = std::result::Result<(), DrawingAreaErrorKind<std::io::Error>>;

/// Writes `<output_dir>/<airline>.svg`: one weekday-by-week grid per year,
/// each day colored by its delay ratio.
pub struct SvgCalendarRenderer {
    output_dir: PathBuf,
    style: HeatmapStyle,
}

impl SvgCalendarRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, style: HeatmapStyle) -> Self {
        Self {
            output_dir: output_dir.into(),
            style,
        }
    }

    pub fn path_for(&self, airline: &str) -> PathBuf {
        self.output_dir.join(format!("{airline}.svg"))
    }

    fn draw(
        &self,
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        airline: &str,
        series: &DailySeries,
        years: &BTreeSet<i32>,
    ) -> DrawResult {
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            self.style.title_for(airline),
            (LEFT, TOP / 2),
            ("sans-serif", 20).into_font(),
        ))?;

        let (vmin, vmax) = value_range(series);
        let normalize = |v: f64| {
            if vmax > vmin {
                (v - vmin) / (vmax - vmin)
            } else {
                0.5
            }
        };

        let mut panel_top = TOP;
        for &year in years {
            self.draw_year(root, year, panel_top, series, &normalize)?;
            panel_top += panel_height();
        }

        self.draw_legend(root, panel_top, vmin, vmax)?;
        root.present()
    }

    fn draw_year(
        &self,
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        year: i32,
        top: i32,
        series: &DailySeries,
        normalize: &impl Fn(f64) -> f64,
    ) -> DrawResult {
        let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            return Ok(());
        };

        let label_font = ("sans-serif", 12).into_font();
        root.draw(&Text::new(year.to_string(), (4, top + 10), label_font.clone()))?;

        let grid_top = top + PANEL_HEADER;
        for (row, name) in [(0, "Mon"), (2, "Wed"), (4, "Fri")] {
            root.draw(&Text::new(
                name,
                (8, grid_top + row * CELL + CELL / 4),
                label_font.clone(),
            ))?;
        }

        for day in first.iter_days().take_while(|d| d.year() == year) {
            let (x, y) = cell_origin(day, grid_top);

            if day.day() == 1 {
                let month = MONTHS[day.month0() as usize];
                root.draw(&Text::new(month, (x, grid_top - 14), label_font.clone()))?;
            }

            let fill = match series.get(&day) {
                Some(&ratio) => self.style.color_scale.color_at(normalize(ratio)),
                None => MISSING_DAY,
            };
            let corners = [(x, y), (x + CELL, y + CELL)];
            root.draw(&Rectangle::new(corners, fill.filled()))?;
            if self.style.line_width > 0 {
                root.draw(&Rectangle::new(
                    corners,
                    self.style.edge_color.stroke_width(self.style.line_width),
                ))?;
            }
        }

        Ok(())
    }

    fn draw_legend(
        &self,
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        top: i32,
        vmin: f64,
        vmax: f64,
    ) -> DrawResult {
        let font = ("sans-serif", 12).into_font();
        let swatch = CELL * 2;
        let y = top + 8;

        root.draw(&Text::new(format!("{:.0}%", vmin * 100.0), (LEFT, y + 4), font.clone()))?;
        let start = LEFT + 40;
        for step in 0..LEGEND_STEPS {
            let t = step as f64 / (LEGEND_STEPS - 1) as f64;
            let x = start + step * swatch;
            root.draw(&Rectangle::new(
                [(x, y), (x + swatch, y + CELL)],
                self.style.color_scale.color_at(t).filled(),
            ))?;
        }
        root.draw(&Text::new(
            format!("{:.0}%", vmax * 100.0),
            (start + LEGEND_STEPS * swatch + 8, y + 4),
            font,
        ))?;

        Ok(())
    }
}

impl CalendarRenderer for SvgCalendarRenderer {
    fn render(&self, airline: &str, series: &DailySeries) -> Result<PathBuf> {
        // The code becomes a file name inside `output_dir`.
        if airline.is_empty() || !airline.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(render_error(airline, "airline code is not a plain file name"));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(airline);

        let years: BTreeSet<i32> = series.keys().map(|d| d.year()).collect();
        let width = LEFT + WEEK_COLUMNS * CELL + RIGHT;
        let height = TOP + years.len() as i32 * panel_height() + LEGEND_HEIGHT;

        {
            let root =
                SVGBackend::new(&path, (width as u32, height as u32)).into_drawing_area();
            self.draw(&root, airline, series, &years)
                .map_err(|e| render_error(airline, e))?;
        }

        debug!(airline, days = series.len(), path = %path.display(), "Heatmap written");
        Ok(path)
    }
}

fn panel_height() -> i32 {
    PANEL_HEADER + 7 * CELL + PANEL_GAP
}

/// Top-left pixel of a day's cell: weeks run left to right, Monday on top.
fn cell_origin(day: NaiveDate, grid_top: i32) -> (i32, i32) {
    let weekday = day.weekday().num_days_from_monday() as i32;
    let ordinal0 = day.ordinal0() as i32;
    let jan1_weekday = (weekday - ordinal0).rem_euclid(7);
    let column = (ordinal0 + jan1_weekday) / 7;

    (LEFT + column * CELL, grid_top + weekday * CELL)
}

fn value_range(series: &DailySeries) -> (f64, f64) {
    let mut values = series.values().copied();
    let Some(first) = values.next() else {
        return (0.0, 1.0);
    };
    values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::env;
    use std::fs;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cell_origin_weeks_start_on_monday() {
        // 2015-01-01 was a Thursday
        let (x, y) = cell_origin(date(2015, 1, 1), 0);
        assert_eq!((x, y), (LEFT, 3 * CELL));

        // Monday 2015-01-05 opens the second column
        let (x, y) = cell_origin(date(2015, 1, 5), 0);
        assert_eq!((x, y), (LEFT + CELL, 0));

        // 2015-12-31, a Thursday, sits in column 52
        let (x, _) = cell_origin(date(2015, 12, 31), 0);
        assert_eq!(x, LEFT + 52 * CELL);
    }

    #[test]
    fn test_cell_origin_fits_grid() {
        // 2012 is a leap year starting on a Sunday: the widest possible layout
        let (x, _) = cell_origin(date(2012, 12, 31), 0);
        assert!(x < LEFT + WEEK_COLUMNS * CELL);
    }

    #[test]
    fn test_value_range() {
        let series: DailySeries = [(date(2015, 1, 1), 0.4), (date(2015, 1, 2), 0.1)]
            .into_iter()
            .collect();
        assert_eq!(value_range(&series), (0.1, 0.4));
        assert_eq!(value_range(&DailySeries::new()), (0.0, 1.0));
    }

    #[test]
    fn test_render_writes_svg() {
        let dir = env::temp_dir().join("flight_delays_test_render");
        let _ = fs::remove_dir_all(&dir);

        let renderer = SvgCalendarRenderer::new(&dir, HeatmapStyle::default());
        let series: DailySeries = [
            (date(2015, 1, 1), 0.5),
            (date(2015, 6, 15), 1.0),
            (date(2016, 2, 29), 0.0),
        ]
        .into_iter()
        .collect();

        let path = renderer.render("AA", &series).unwrap();
        assert_eq!(path, dir.join("AA.svg"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("<svg"));
        assert!(content.contains("Flight delay heatmap - airline AA"));
        assert!(content.contains("2016"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_render_rejects_path_like_airline() {
        let dir = env::temp_dir().join("flight_delays_test_render_escape");
        let renderer = SvgCalendarRenderer::new(dir.join("out"), HeatmapStyle::default());
        let series: DailySeries = [(date(2015, 1, 1), 0.5)].into_iter().collect();

        for airline in ["../AA", "A/B", ""] {
            let result = renderer.render(airline, &series);
            assert!(matches!(result, Err(PipelineError::Render { .. })), "{airline}");
        }
        assert!(!dir.join("AA.svg").exists());
    }
}
