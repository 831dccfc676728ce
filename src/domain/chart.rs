// Chart presentation models: colors, theme and per-draw configuration
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fill alpha for the area under a line chart (0x20 of 0xff)
pub const AREA_FILL_ALPHA: u8 = 0x20;
/// Fill alpha for the area under a sparkline (0x30 of 0xff)
pub const MINI_FILL_ALPHA: u8 = 0x30;

pub const DEFAULT_PADDING: f64 = 40.0;
pub const DEFAULT_GRID_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn opaque(self) -> Rgba {
        self.with_alpha(0xff)
    }

    pub fn with_alpha(self, a: u8) -> Rgba {
        Rgba { rgb: self, a }
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse `#rrggbb` (the leading `#` is optional)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid color '{}'", s));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid color '{}'", s))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub a: u8,
}

impl Rgba {
    pub fn opacity(&self) -> f64 {
        self.a as f64 / 255.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn palette(self) -> ThemePalette {
        match self {
            Theme::Light => ThemePalette {
                background: Rgb::new(0xff, 0xff, 0xff),
                grid: Rgb::new(0xe2, 0xe8, 0xf0),
                label: Rgb::new(0x71, 0x80, 0x96),
            },
            Theme::Dark => ThemePalette {
                background: Rgb::new(0x2d, 0x37, 0x48),
                grid: Rgb::new(0x4a, 0x55, 0x68),
                label: Rgb::new(0xcb, 0xd5, 0xe0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: Rgb,
    pub grid: Rgb,
    pub label: Rgb,
}

/// Stepped font size and label density for a given surface width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelDensity {
    pub font_px: u32,
    pub max_x_labels: usize,
    pub y_labels: usize,
    pub time_only: bool,
}

impl LabelDensity {
    pub fn for_width(width: f64) -> Self {
        let (font_px, max_x_labels) = if width < 300.0 {
            (8, 4)
        } else if width < 400.0 {
            (9, 5)
        } else {
            (10, 8)
        };

        Self {
            font_px,
            max_x_labels,
            y_labels: if width < 300.0 { 3 } else { DEFAULT_GRID_LINES },
            time_only: width < 350.0,
        }
    }
}

/// Immutable settings for a single draw call
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub color: Rgb,
    pub theme: Theme,
    pub grid_lines: usize,
    pub density: LabelDensity,
}

impl ChartConfig {
    pub fn responsive(width: f64, height: f64, color: Rgb, theme: Theme) -> Self {
        Self {
            width,
            height,
            padding: DEFAULT_PADDING,
            color,
            theme,
            grid_lines: DEFAULT_GRID_LINES,
            density: LabelDensity::for_width(width),
        }
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_max_labels(mut self, max_labels: usize) -> Self {
        self.density.max_x_labels = max_labels.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        let c: Rgb = "#f56565".parse().unwrap();
        assert_eq!(c, Rgb::new(0xf5, 0x65, 0x65));
        assert_eq!(c.to_string(), "#f56565");
        assert!("#f565".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_area_alpha_is_about_an_eighth() {
        let fill = Rgb::new(0, 0, 0).with_alpha(AREA_FILL_ALPHA);
        assert!((fill.opacity() - 0.125).abs() < 0.01);
    }

    #[test]
    fn test_density_steps_down_with_width() {
        let wide = LabelDensity::for_width(800.0);
        let medium = LabelDensity::for_width(380.0);
        let narrow = LabelDensity::for_width(250.0);

        assert_eq!((wide.font_px, wide.max_x_labels, wide.y_labels), (10, 8, 5));
        assert_eq!((medium.font_px, medium.max_x_labels), (9, 5));
        assert!(!medium.time_only);
        assert_eq!((narrow.font_px, narrow.max_x_labels, narrow.y_labels), (8, 4, 3));
        assert!(narrow.time_only);
    }
}
