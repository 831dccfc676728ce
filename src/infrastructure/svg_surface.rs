// SVG drawing surface for the series renderer, backed by plotters
use crate::application::renderer::{Point, Surface, TextAlign, TextStyle};
use crate::domain::chart::Rgba;
use plotters_backend::{BackendCoord, DrawingBackend, DrawingErrorKind};
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, RGBAColor, ShapeStyle, TextStyle as PlotTextStyle};
use plotters_svg::SVGBackend;

pub type SvgError = DrawingErrorKind<std::io::Error>;

#[derive(Debug, Clone)]
enum Op {
    Rect {
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        color: Rgba,
    },
    Polyline {
        points: Vec<BackendCoord>,
        color: Rgba,
        width: u32,
    },
    Polygon {
        points: Vec<BackendCoord>,
        color: Rgba,
    },
    Text {
        text: String,
        at: BackendCoord,
        style: TextStyle,
    },
}

/// Records drawing operations and replays them onto an `SVGBackend` on `finish`.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    ops: Vec<Op>,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0).round() as u32,
            height: height.max(1.0).round() as u32,
            ops: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn finish(self) -> Result<String, SvgError> {
        let mut out = String::new();
        {
            let mut backend = SVGBackend::with_string(&mut out, (self.width, self.height));
            for op in &self.ops {
                replay(&mut backend, op)?;
            }
            backend.present()?;
        }
        Ok(out)
    }
}

fn replay(backend: &mut SVGBackend<'_>, op: &Op) -> Result<(), SvgError> {
    match op {
        Op::Rect {
            upper_left,
            bottom_right,
            color,
        } => backend.draw_rect(*upper_left, *bottom_right, &shape(*color, true, 0), true),
        Op::Polyline {
            points,
            color,
            width,
        } => backend.draw_path(points.iter().copied(), &shape(*color, false, *width)),
        Op::Polygon { points, color } => {
            backend.fill_polygon(points.iter().copied(), &shape(*color, true, 0))
        }
        Op::Text { text, at, style } => {
            let h_pos = match style.align {
                TextAlign::Center => HPos::Center,
                TextAlign::Right => HPos::Right,
            };
            let text_color = plot_color(style.color);
            let text_style = PlotTextStyle::from((FontFamily::SansSerif, f64::from(style.font_px)))
                .color(&text_color)
                .pos(Pos::new(h_pos, VPos::Bottom));
            backend.draw_text(text, &text_style, *at)
        }
    }
}

fn plot_color(color: Rgba) -> RGBAColor {
    RGBAColor(color.rgb.r, color.rgb.g, color.rgb.b, color.opacity())
}

fn shape(color: Rgba, filled: bool, stroke_width: u32) -> ShapeStyle {
    ShapeStyle {
        color: plot_color(color),
        filled,
        stroke_width,
    }
}

fn coord(p: Point) -> BackendCoord {
    (p.x.round() as i32, p.y.round() as i32)
}

impl Surface for SvgSurface {
    fn clear(&mut self) {
        self.ops.clear();
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Rgba) {
        self.ops.push(Op::Rect {
            upper_left: coord(origin),
            bottom_right: coord(Point::new(origin.x + width, origin.y + height)),
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[Point], color: Rgba, line_width: f64) {
        if points.is_empty() {
            return;
        }
        self.ops.push(Op::Polyline {
            points: points.iter().copied().map(coord).collect(),
            color,
            width: line_width.max(1.0).round() as u32,
        });
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        self.ops.push(Op::Polygon {
            points: points.iter().copied().map(coord).collect(),
            color,
        });
    }

    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle) {
        self.ops.push(Op::Text {
            text: text.to_string(),
            at: coord(at),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::renderer::draw_line_chart;
    use crate::domain::chart::{ChartConfig, Rgb, Theme, AREA_FILL_ALPHA};
    use crate::domain::telemetry::SeriesPoint;
    use chrono::NaiveDate;

    fn finish(surface: SvgSurface) -> String {
        surface.finish().unwrap().to_ascii_lowercase()
    }

    #[test]
    fn test_translucent_fill_carries_opacity() {
        let mut surface = SvgSurface::new(20.0, 20.0);
        let color = Rgb::new(0x48, 0xbb, 0x78).with_alpha(AREA_FILL_ALPHA);
        surface.fill_polygon(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            color,
        );
        let svg = finish(surface);

        assert!(svg.contains("<polygon"));
        assert!(svg.contains("#48bb78"));
        assert!(svg.contains("opacity=\"0.125"));
    }

    #[test]
    fn test_clear_discards_previous_drawing() {
        let mut surface = SvgSurface::new(100.0, 50.0);
        surface.fill_rect(Point::new(0.0, 0.0), 10.0, 10.0, Rgb::new(0x12, 0x34, 0x56).opaque());
        surface.clear();
        assert!(surface.is_blank());

        let svg = finish(surface);
        assert!(svg.contains("<svg"));
        assert!(!svg.contains("#123456"));
    }

    #[test]
    fn test_line_chart_renders_polyline() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let points: Vec<SeriesPoint> = [20.0, 25.0, 22.5]
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(start + chrono::Duration::hours(i as i64), *v))
            .collect();
        let config = ChartConfig::responsive(200.0, 100.0, Rgb::new(0xf5, 0x65, 0x65), Theme::Light)
            .with_padding(40.0);

        let mut surface = SvgSurface::new(200.0, 100.0);
        draw_line_chart(&mut surface, &points, &config);
        let svg = finish(surface);

        assert!(svg.contains("<polyline"));
        assert!(svg.contains("points=\"40,60 100,40 160,50"));
        assert!(svg.contains("stroke=\"#f56565\""));
        // narrow surface: time-only labels
        assert!(svg.contains(">09:00</text>"));
        assert!(svg.contains("text-anchor=\"end\""));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut surface = SvgSurface::new(10.0, 10.0);
        let style = TextStyle {
            font_px: 10,
            align: TextAlign::Center,
            color: Rgb::new(0, 0, 0).opaque(),
        };
        surface.fill_text("a<b & c", Point::new(0.0, 0.0), style);
        let svg = finish(surface);

        assert!(svg.contains("a&lt;b &amp; c"));
        assert!(!svg.contains("a<b"));
    }

    #[test]
    fn test_fractional_coordinates_round_to_pixels() {
        assert_eq!(coord(Point::new(44.6, 10.4)), (45, 10));
    }
}
