// Series renderer - Draws line, bar and mini charts onto a drawing surface
use crate::application::chart_scale::{value_runs, x_label_indices, PlotArea, ValueScale};
use crate::domain::chart::{ChartConfig, Rgba, AREA_FILL_ALPHA, MINI_FILL_ALPHA};
use crate::domain::telemetry::{BarDatum, SeriesPoint};

const LINE_WIDTH: f64 = 2.0;
const GRID_LINE_WIDTH: f64 = 1.0;
const BAR_FONT_PX: u32 = 11;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_px: u32,
    pub align: TextAlign,
    pub color: Rgba,
}

/// 2D raster the renderer draws on. Sizing and pixel-ratio scaling belong to the caller.
pub trait Surface {
    fn clear(&mut self);
    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Rgba);
    fn stroke_polyline(&mut self, points: &[Point], color: Rgba, line_width: f64);
    fn fill_polygon(&mut self, points: &[Point], color: Rgba);
    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle);
}

/// Area chart with gridlines and axis labels. Empty or all-missing input leaves a cleared surface.
pub fn draw_line_chart<S: Surface + ?Sized>(surface: &mut S, points: &[SeriesPoint], config: &ChartConfig) {
    surface.clear();

    let Some(scale) = ValueScale::from_points(points) else {
        return;
    };

    let palette = config.theme.palette();
    let area = PlotArea::new(config.width, config.height, config.padding);
    let count = points.len();

    surface.fill_rect(Point::new(0.0, 0.0), config.width, config.height, palette.background.opaque());

    for i in 0..=config.grid_lines {
        let y = area.grid_y(i, config.grid_lines);
        surface.stroke_polyline(
            &[Point::new(area.padding, y), Point::new(config.width - area.padding, y)],
            palette.grid.opaque(),
            GRID_LINE_WIDTH,
        );
    }

    let stroke = config.color.opaque();
    let fill = config.color.with_alpha(AREA_FILL_ALPHA);
    for run in value_runs(points) {
        let line: Vec<Point> = run
            .iter()
            .map(|(i, v)| Point::new(area.x_at(*i, count), area.y_at(*v, &scale)))
            .collect();
        surface.stroke_polyline(&line, stroke, LINE_WIDTH);
        surface.fill_polygon(&close_to_baseline(line, area.baseline()), fill);
    }

    let density = config.density;
    let label_color = palette.label.opaque();

    for i in x_label_indices(count, density.max_x_labels) {
        let x = area.x_at(i, count);
        let (date, time) = points[i].label_parts();
        let style = TextStyle {
            font_px: density.font_px,
            align: TextAlign::Center,
            color: label_color,
        };

        if density.time_only {
            let short: String = time.chars().take(5).collect();
            surface.fill_text(&short, Point::new(x, config.height - 8.0), style);
        } else {
            surface.fill_text(&date, Point::new(x, config.height - 18.0), style);
            surface.fill_text(&time, Point::new(x, config.height - 6.0), style);
        }
    }

    let y_style = TextStyle {
        font_px: density.font_px,
        align: TextAlign::Right,
        color: label_color,
    };
    for (i, value) in scale.tick_values(density.y_labels).into_iter().enumerate() {
        let y = area.grid_y(i, density.y_labels);
        surface.fill_text(&format!("{:.1}", value), Point::new(area.padding - 5.0, y + 4.0), y_style);
    }
}

/// Sparkline: same scaling as the line chart, edge to edge, no axes or labels
pub fn draw_mini_chart<S: Surface + ?Sized>(surface: &mut S, points: &[SeriesPoint], config: &ChartConfig) {
    surface.clear();

    let Some(scale) = ValueScale::from_points(points) else {
        return;
    };

    let area = PlotArea::new(config.width, config.height, 0.0);
    let count = points.len();
    let stroke = config.color.opaque();
    let fill = config.color.with_alpha(MINI_FILL_ALPHA);

    for run in value_runs(points) {
        let line: Vec<Point> = run
            .iter()
            .map(|(i, v)| Point::new(area.x_at(*i, count), area.y_at(*v, &scale)))
            .collect();
        surface.stroke_polyline(&line, stroke, LINE_WIDTH);
        surface.fill_polygon(&close_to_baseline(line, area.baseline()), fill);
    }
}

/// Bars baseline at zero and scale against the largest value.
/// A non-positive maximum yields zero-height bars.
pub fn draw_bar_chart<S: Surface + ?Sized>(surface: &mut S, bars: &[BarDatum], config: &ChartConfig) {
    surface.clear();

    if bars.is_empty() {
        return;
    }

    let palette = config.theme.palette();
    let area = PlotArea::new(config.width, config.height, config.padding);
    surface.fill_rect(Point::new(0.0, 0.0), config.width, config.height, palette.background.opaque());

    let max_value = bars
        .iter()
        .map(|b| b.value)
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    let count = bars.len() as f64;
    let slot = area.inner_width() / count;
    let bar_width = slot * 0.8;
    let label_style = TextStyle {
        font_px: BAR_FONT_PX,
        align: TextAlign::Center,
        color: palette.label.opaque(),
    };

    for (i, bar) in bars.iter().enumerate() {
        let x = area.padding + slot * i as f64 + bar_width * 0.1;
        let bar_height = bar_height(bar.value, max_value, area.inner_height());
        let y = area.baseline() - bar_height;

        surface.fill_rect(Point::new(x, y), bar_width, bar_height, config.color.opaque());
        surface.fill_text(
            &bar.label,
            Point::new(x + bar_width / 2.0, config.height - 10.0),
            label_style,
        );
    }
}

fn bar_height(value: f64, max_value: f64, inner_height: f64) -> f64 {
    if !(max_value.is_finite() && max_value > 0.0) || !value.is_finite() {
        return 0.0;
    }
    (value / max_value * inner_height).max(0.0)
}

fn close_to_baseline(mut line: Vec<Point>, baseline: f64) -> Vec<Point> {
    if let (Some(first), Some(last)) = (line.first().copied(), line.last().copied()) {
        line.push(Point::new(last.x, baseline));
        line.push(Point::new(first.x, baseline));
    }
    line
}
