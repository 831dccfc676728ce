// Telemetry data domain models
use chrono::NaiveDateTime;
use serde::Serialize;

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    /// NaN marks a sample whose value could not be parsed.
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn is_missing(&self) -> bool {
        !self.value.is_finite()
    }

    /// Display label split into a date part and a time part
    pub fn label_parts(&self) -> (String, String) {
        (
            self.timestamp.format(DATE_FORMAT).to_string(),
            self.timestamp.format(TIME_FORMAT).to_string(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Series {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(id: String, name: String, color: Option<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            id,
            name,
            color,
            points,
        }
    }

    pub fn stats(&self) -> Option<SeriesStats> {
        SeriesStats::from_points(&self.points)
    }

    /// Downsample points using bucket averaging, keeping at most `max_points`
    pub fn downsample(mut self, max_points: usize) -> Self {
        self.points = downsample_points(self.points, max_points);
        self
    }
}

/// Summary figures shown next to a chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub latest: f64,
}

impl SeriesStats {
    pub fn from_points(points: &[SeriesPoint]) -> Option<Self> {
        let values: Vec<f64> = points
            .iter()
            .filter(|p| !p.is_missing())
            .map(|p| p.value)
            .collect();
        let latest = *values.last()?;

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;

        Some(Self {
            min,
            max,
            avg,
            latest,
        })
    }
}

/// One labelled bar of a bar chart
#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub label: String,
    pub value: f64,
}

impl BarDatum {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

fn downsample_points(points: Vec<SeriesPoint>, max_points: usize) -> Vec<SeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = (points.len() as f64 / max_points as f64).ceil() as usize;
    let mut downsampled = Vec::with_capacity(max_points);

    for chunk in points.chunks(bucket_size) {
        // Use middle point's timestamp and the average of the parseable values
        let mid_idx = chunk.len() / 2;
        let valid: Vec<f64> = chunk
            .iter()
            .filter(|p| !p.is_missing())
            .map(|p| p.value)
            .collect();
        let avg_value = if valid.is_empty() {
            f64::NAN
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        };

        downsampled.push(SeriesPoint::new(chunk[mid_idx].timestamp, avg_value));
    }

    downsampled
}
