// HTTP repository for the weather station backend API
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::readings::{
    Forecast, ForecastPoint, HistoryPage, HistoryRecord, ModelInfo, Reading, SystemStats,
};
use crate::domain::sensor::{Sensor, TimeRange};
use crate::domain::telemetry::{Series, SeriesPoint};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const TIMESTAMP_FORMATS: [&str; 3] = ["%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} for {url}: {body}")]
    Status { url: String, status: StatusCode, body: String },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed response from {url}: {reason}")]
    Shape { url: String, reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct HttpTelemetryRepository {
    client: Client,
    base_url: String,
}

impl HttpTelemetryRepository {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    async fn get_json(&self, path_and_query: &str) -> Result<Value, ClientError> {
        let url = self.url(path_and_query);
        tracing::debug!(url = %url, "requesting backend data");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ClientError::Request {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(ClientError::Status { url, status, body });
        }

        serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
    }

    async fn get_typed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let body = self.get_json(path).await?;
        serde_json::from_value(body).map_err(|source| ClientError::Decode {
            url: self.url(path),
            source,
        })
    }

    async fn get_object(&self, path_and_query: &str) -> Result<Map<String, Value>, ClientError> {
        match self.get_json(path_and_query).await? {
            Value::Object(map) => Ok(map),
            _ => Err(ClientError::Shape {
                url: self.url(path_and_query),
                reason: "expected a JSON object",
            }),
        }
    }
}

#[async_trait]
impl TelemetryRepository for HttpTelemetryRepository {
    async fn realtime_reading(&self) -> anyhow::Result<Reading> {
        let body = self.get_object("/api/realtime-data").await?;
        Ok(reading_from_json(&body))
    }

    async fn system_stats(&self) -> anyhow::Result<SystemStats> {
        Ok(self.get_typed("/api/system-stats").await?)
    }

    async fn chart_series(&self, range: TimeRange, sensors: &[Sensor]) -> anyhow::Result<Vec<Series>> {
        let keys: Vec<&str> = sensors.iter().map(|s| s.key()).collect();
        let path = format!(
            "/api/charts-data?time_range={}&sensors={}",
            range.as_query(),
            urlencoding::encode(&keys.join(","))
        );
        let body = self.get_object(&path).await?;
        Ok(series_from_json(&body, sensors))
    }

    async fn forecast(&self, hours_ahead: u32) -> anyhow::Result<Forecast> {
        let body = self
            .get_object(&format!("/api/ml/predict?hours_ahead={}", hours_ahead))
            .await?;
        Ok(forecast_from_json(&body))
    }

    async fn model_info(&self) -> anyhow::Result<ModelInfo> {
        Ok(self.get_typed("/api/ml/model-info").await?)
    }

    async fn history(&self, limit: u32, offset: u32) -> anyhow::Result<HistoryPage> {
        let body = self
            .get_object(&format!("/api/sensor-data/history?limit={}&offset={}", limit, offset))
            .await?;
        Ok(history_from_json(&body, limit, offset))
    }
}

/// Numbers or numeric strings; anything else becomes NaN
fn parse_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

fn timestamp_field(object: &Map<String, Value>, key: &str) -> Option<NaiveDateTime> {
    object.get(key).and_then(Value::as_str).and_then(parse_timestamp)
}

fn sensor_values(object: &Map<String, Value>) -> BTreeMap<Sensor, f64> {
    Sensor::ALL
        .iter()
        .filter_map(|sensor| object.get(sensor.key()).map(|v| (*sensor, parse_value(v))))
        .collect()
}

fn reading_from_json(body: &Map<String, Value>) -> Reading {
    Reading {
        timestamp: timestamp_field(body, "timestamp"),
        values: sensor_values(body),
    }
}

fn series_from_json(body: &Map<String, Value>, sensors: &[Sensor]) -> Vec<Series> {
    sensors
        .iter()
        .filter_map(|sensor| {
            let samples = body.get(sensor.key())?.as_array()?;
            let points = samples
                .iter()
                .filter_map(|sample| {
                    let sample = sample.as_object()?;
                    let Some(timestamp) = timestamp_field(sample, "time") else {
                        tracing::debug!(sensor = %sensor, "skipping sample without a readable time");
                        return None;
                    };
                    let value = sample.get("value").map(parse_value).unwrap_or(f64::NAN);
                    Some(SeriesPoint::new(timestamp, value))
                })
                .collect();

            Some(Series::new(
                sensor.key().to_string(),
                sensor.display_name().to_string(),
                None,
                points,
            ))
        })
        .collect()
}

fn forecast_from_json(body: &Map<String, Value>) -> Forecast {
    let points = body
        .get("forecasts")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|entry| {
                    let number = |key: &str| entry.get(key).map(parse_value).unwrap_or(f64::NAN);
                    let or_zero = |key: &str| Some(number(key)).filter(|v| v.is_finite()).unwrap_or(0.0);
                    Some(ForecastPoint {
                        timestamp: timestamp_field(entry, "timestamp")?,
                        temperature: number("temperature"),
                        humidity: number("humidity"),
                        pressure: number("pressure"),
                        will_rain: entry.get("willRain").and_then(Value::as_bool).unwrap_or(false),
                        confidence: number("confidence"),
                        rainfall: or_zero("rainfall"),
                        uv_index: or_zero("uv_index"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Forecast {
        summary: body
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        rain_probability: body.get("rainProbability").map(parse_value).unwrap_or(0.0),
        points,
    }
}

fn history_from_json(body: &Map<String, Value>, limit: u32, offset: u32) -> HistoryPage {
    let records = body
        .get("records")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(Value::as_object)
                .map(|row| HistoryRecord {
                    id: row.get("id").and_then(Value::as_i64).unwrap_or_default(),
                    timestamp: timestamp_field(row, "timestamp"),
                    values: sensor_values(row),
                })
                .collect()
        })
        .unwrap_or_default();

    HistoryPage {
        total: body.get("total").and_then(Value::as_u64).unwrap_or_default(),
        limit,
        offset,
        records,
    }
}
