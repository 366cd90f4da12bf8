//! Color parsing and sequential/diverging color scales for heatmaps.

use plotters::style::RGBColor;
use std::str::FromStr;

use crate::error::PipelineError;

const RD_YL_BU: &[(u8, u8, u8)] = &[
    (165, 0, 38),
    (215, 48, 39),
    (244, 109, 67),
    (253, 174, 97),
    (254, 224, 144),
    (255, 255, 191),
    (224, 243, 248),
    (171, 217, 233),
    (116, 173, 209),
    (69, 117, 180),
    (49, 54, 149),
];

const REDS: &[(u8, u8, u8)] = &[
    (255, 245, 240),
    (254, 224, 210),
    (252, 187, 161),
    (252, 146, 114),
    (251, 106, 74),
    (239, 59, 44),
    (203, 24, 29),
    (165, 15, 21),
    (103, 0, 13),
];

const BLUES: &[(u8, u8, u8)] = &[
    (247, 251, 255),
    (222, 235, 247),
    (198, 219, 239),
    (158, 202, 225),
    (107, 174, 214),
    (66, 146, 198),
    (33, 113, 181),
    (8, 81, 156),
    (8, 48, 107),
];

const GREYS: &[(u8, u8, u8)] = &[
    (255, 255, 255),
    (240, 240, 240),
    (217, 217, 217),
    (189, 189, 189),
    (150, 150, 150),
    (115, 115, 115),
    (82, 82, 82),
    (37, 37, 37),
    (0, 0, 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    RdYlBu,
    Reds,
    Blues,
    Greys,
}

impl Palette {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::RdYlBu => RD_YL_BU,
            Palette::Reds => REDS,
            Palette::Blues => BLUES,
            Palette::Greys => GREYS,
        }
    }
}

/// A palette plus direction. Names follow the usual `Name` / `Name_r`
/// convention, e.g. `RdYlBu_r` runs blue to red.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScale {
    pub palette: Palette,
    pub reversed: bool,
}

impl ColorScale {
    /// Maps `t` in `[0, 1]` to a color by linear interpolation between
    /// palette stops. Out-of-range values are clamped.
    pub fn color_at(&self, t: f64) -> RGBColor {
        let stops = self.palette.stops();
        let mut t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if self.reversed {
            t = 1.0 - t;
        }

        let pos = t * (stops.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = pos - lo as f64;

        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (stops[lo], stops[hi]);
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

impl FromStr for ColorScale {
    type Err = PipelineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let palette = match base {
            "RdYlBu" => Palette::RdYlBu,
            "Reds" => Palette::Reds,
            "Blues" => Palette::Blues,
            "Greys" | "Grays" => Palette::Greys,
            _ => {
                return Err(PipelineError::Config(format!(
                    "unknown color scale '{name}'"
                )));
            }
        };
        Ok(ColorScale { palette, reversed })
    }
}

/// Parses `#rrggbb`, `#rgb` or one of a handful of color names.
pub fn parse_color(text: &str) -> Result<RGBColor, PipelineError> {
    let text = text.trim();
    let named = match text.to_ascii_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        "lightgray" | "lightgrey" => Some(RGBColor(211, 211, 211)),
        "whitesmoke" => Some(RGBColor(245, 245, 245)),
        "red" => Some(RGBColor(255, 0, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        _ => None,
    };
    if let Some(color) = named {
        return Ok(color);
    }

    let invalid = || PipelineError::Config(format!("invalid color '{text}'"));
    let hex = text.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(RGBColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Ok(RGBColor(short(0)?, short(1)?, short(2)?))
        }
        _ => Err(invalid()),
    }
}
