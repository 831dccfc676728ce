// Axis scaling and label decimation for the series renderer
use crate::domain::telemetry::SeriesPoint;

/// Value axis derived from the parseable values of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl ValueScale {
    /// Returns `None` when no value in the series is parseable.
    ///
    /// A flat series gets a unit range centred on its value so that it is drawn
    /// along the vertical middle of the plot.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;

        let range = max - min;
        if range == 0.0 {
            return Some(Self {
                min: min - 0.5,
                max: max + 0.5,
                range: 1.0,
            });
        }

        Some(Self { min, max, range })
    }

    pub fn from_points(points: &[SeriesPoint]) -> Option<Self> {
        Self::from_values(points.iter().map(|p| p.value))
    }

    /// Fraction of the range covered by `value`, 0 at `min` and 1 at `max`
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    /// Evenly spaced axis values from top (`max`) to bottom (`min`), `steps + 1` of them
    pub fn tick_values(&self, steps: usize) -> Vec<f64> {
        let steps = steps.max(1);
        (0..=steps)
            .map(|i| self.min + self.range * (steps - i) as f64 / steps as f64)
            .collect()
    }
}

/// Drawable rectangle inside a surface, inset by `padding` on every side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl PlotArea {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    pub fn inner_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    pub fn inner_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }

    pub fn baseline(&self) -> f64 {
        self.height - self.padding
    }

    /// Horizontal position of point `index` out of `count`; a lone point sits at the left edge
    pub fn x_at(&self, index: usize, count: usize) -> f64 {
        if count <= 1 {
            return self.padding;
        }
        self.padding + self.inner_width() * index as f64 / (count - 1) as f64
    }

    /// Vertical position with an inverted Y axis: larger values sit higher
    pub fn y_at(&self, value: f64, scale: &ValueScale) -> f64 {
        self.baseline() - scale.normalize(value) * self.inner_height()
    }

    /// Y coordinate of horizontal gridline `i` out of `steps`, top to bottom
    pub fn grid_y(&self, i: usize, steps: usize) -> f64 {
        self.padding + self.inner_height() * i as f64 / steps.max(1) as f64
    }
}

/// Indices that get an X axis label: every `ceil(count / max_labels)`-th point plus the last one
pub fn x_label_indices(count: usize, max_labels: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }

    let interval = count.div_ceil(max_labels.max(1)).max(1);
    (0..count)
        .filter(|i| i % interval == 0 || *i == count - 1)
        .collect()
}

/// Split a series into runs of consecutive parseable values, as `(index, value)` pairs.
/// Missing values break the line instead of being interpolated across.
pub fn value_runs(points: &[SeriesPoint]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (i, point) in points.iter().enumerate() {
        if point.is_missing() {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push((i, point.value));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(start + chrono::Duration::hours(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_scale_excludes_missing_values() {
        let scale = ValueScale::from_points(&series(&[3.0, f64::NAN, 9.0, f64::INFINITY])).unwrap();
        assert_eq!(scale.min, 3.0);
        assert_eq!(scale.max, 9.0);
        assert_eq!(scale.range, 6.0);
    }

    #[test]
    fn test_scale_all_missing() {
        assert!(ValueScale::from_points(&series(&[f64::NAN, f64::NAN])).is_none());
        assert!(ValueScale::from_points(&[]).is_none());
    }

    #[test]
    fn test_flat_series_sits_on_midline() {
        let scale = ValueScale::from_points(&series(&[5.0, 5.0, 5.0])).unwrap();
        assert_eq!(scale.range, 1.0);

        let area = PlotArea::new(200.0, 100.0, 40.0);
        let y = area.y_at(5.0, &scale);
        assert!(y.is_finite());
        assert_eq!(y, 50.0);
    }

    #[test]
    fn test_geometry_matches_worked_example() {
        let points = series(&[20.0, 25.0, 22.5]);
        let scale = ValueScale::from_points(&points).unwrap();
        assert_eq!((scale.min, scale.max, scale.range), (20.0, 25.0, 5.0));

        let area = PlotArea::new(200.0, 100.0, 40.0);
        assert_eq!(area.x_at(1, 3), 100.0);
        assert_eq!(area.y_at(25.0, &scale), 40.0);
        assert_eq!(area.y_at(20.0, &scale), 60.0);
    }

    #[test]
    fn test_single_point_at_padding() {
        let area = PlotArea::new(200.0, 100.0, 40.0);
        assert_eq!(area.x_at(0, 1), 40.0);
    }

    #[test]
    fn test_max_is_drawn_above_min() {
        let scale = ValueScale::from_points(&series(&[-4.0, 12.0, 7.5, 0.0])).unwrap();
        let area = PlotArea::new(640.0, 320.0, 50.0);
        assert!(area.y_at(scale.max, &scale) < area.y_at(scale.min, &scale));
        assert_eq!(area.y_at(scale.max, &scale), 50.0);
        assert_eq!(area.y_at(scale.min, &scale), 270.0);
    }

    #[test]
    fn test_tick_values_top_to_bottom() {
        let scale = ValueScale::from_values([0.0, 10.0]).unwrap();
        assert_eq!(scale.tick_values(5), vec![10.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn test_label_decimation() {
        let indices = x_label_indices(100, 8);
        // interval = ceil(100 / 8) = 13
        assert_eq!(indices, vec![0, 13, 26, 39, 52, 65, 78, 91, 99]);
        assert!(indices.len() <= 8 + 1);

        assert_eq!(x_label_indices(3, 8), vec![0, 1, 2]);
        assert_eq!(x_label_indices(1, 8), vec![0]);
        assert!(x_label_indices(0, 8).is_empty());
    }

    #[test]
    fn test_value_runs_split_on_gaps() {
        let runs = value_runs(&series(&[1.0, 2.0, f64::NAN, 4.0, f64::NAN]));
        assert_eq!(runs, vec![vec![(0, 1.0), (1, 2.0)], vec![(3, 4.0)]]);
    }
}
