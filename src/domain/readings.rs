// Backend payloads reduced to the shapes the panels work with
use crate::domain::sensor::Sensor;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest combined sensor + weather reading
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub timestamp: Option<NaiveDateTime>,
    pub values: BTreeMap<Sensor, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub active_sensors: u64,
    pub total_records: u64,
    pub sensor_records: u64,
    pub weather_records: u64,
    pub records_today: u64,
    pub last_update: String,
    pub database_size: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub will_rain: bool,
    pub confidence: f64,
    /// Expected rainfall in mm, zero when the model gives none
    pub rainfall: f64,
    /// Zero when the model gives none
    pub uv_index: f64,
}

impl ForecastPoint {
    fn rains(&self) -> bool {
        self.will_rain || self.rainfall > 0.5
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub summary: String,
    pub rain_probability: f64,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Per-day summaries in forecast order, at most `days` of them
    pub fn daily_outlook(&self, days: usize) -> Vec<DailyOutlook> {
        let mut grouped: Vec<(NaiveDate, Vec<&ForecastPoint>)> = Vec::new();
        for point in &self.points {
            let date = point.timestamp.date();
            match grouped.iter_mut().find(|(d, _)| *d == date) {
                Some((_, points)) => points.push(point),
                None => grouped.push((date, vec![point])),
            }
        }

        grouped
            .into_iter()
            .take(days)
            .map(|(date, points)| DailyOutlook::from_points(date, &points))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Rain,
    MayRain,
    Cloudy,
    ManyClouds,
    SunnyLight,
    Sunny,
}

/// One day of the multi-day outlook
#[derive(Debug, Clone, Serialize)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub avg_humidity: f64,
    pub total_rainfall: f64,
    pub avg_uv: f64,
    /// Percentage of the day's points expecting rain
    pub rain_chance: f64,
    pub condition: Condition,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

impl DailyOutlook {
    fn from_points(date: NaiveDate, points: &[&ForecastPoint]) -> Self {
        let temps: Vec<f64> = points.iter().map(|p| p.temperature).filter(|t| t.is_finite()).collect();
        let avg_humidity = mean(points.iter().map(|p| p.humidity).filter(|h| h.is_finite()));
        let total_rainfall: f64 = points.iter().map(|p| p.rainfall).sum();
        let avg_uv = mean(points.iter().map(|p| p.uv_index).filter(|u| *u > 0.0));
        let rain_chance = if points.is_empty() {
            0.0
        } else {
            points.iter().filter(|p| p.rains()).count() as f64 / points.len() as f64 * 100.0
        };

        Self {
            date,
            temp_min: temps.iter().copied().reduce(f64::min),
            temp_max: temps.iter().copied().reduce(f64::max),
            avg_humidity,
            total_rainfall,
            avg_uv,
            rain_chance,
            condition: Condition::classify(total_rainfall, rain_chance, avg_uv, avg_humidity),
        }
    }
}

impl Condition {
    pub fn classify(total_rainfall: f64, rain_chance: f64, avg_uv: f64, avg_humidity: f64) -> Self {
        if total_rainfall > 10.0 || rain_chance > 70.0 {
            Self::Rain
        } else if total_rainfall > 2.0 || rain_chance > 50.0 {
            Self::MayRain
        } else if rain_chance > 30.0 {
            Self::Cloudy
        } else if avg_uv >= 6.0 {
            Self::Sunny
        } else if avg_uv >= 3.0 {
            Self::SunnyLight
        } else if avg_humidity > 85.0 {
            Self::ManyClouds
        } else if avg_uv > 0.0 {
            Self::Cloudy
        } else {
            Self::Sunny
        }
    }
}

/// Forecast model status as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub models_available: Vec<String>,
    pub training_count: u64,
    pub last_trained: Option<String>,
    pub last_accuracy: Option<f64>,
    pub last_data_points: u64,
    pub status: String,
}

impl ModelInfo {
    pub fn is_trained(&self) -> bool {
        !self.models_available.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: Option<NaiveDateTime>,
    pub values: BTreeMap<Sensor, f64>,
}

/// One page of the paginated history table
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub records: Vec<HistoryRecord>,
}
