// Repository trait for the backend data-fetch contract
use crate::domain::readings::{Forecast, HistoryPage, ModelInfo, Reading, SystemStats};
use crate::domain::sensor::{Sensor, TimeRange};
use crate::domain::telemetry::Series;
use async_trait::async_trait;

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Latest combined sensor and weather reading
    async fn realtime_reading(&self) -> anyhow::Result<Reading>;

    /// Record counts and last update time
    async fn system_stats(&self) -> anyhow::Result<SystemStats>;

    /// One series per requested sensor over the given time range
    async fn chart_series(&self, range: TimeRange, sensors: &[Sensor]) -> anyhow::Result<Vec<Series>>;

    /// Model forecast for the next `hours_ahead` hours
    async fn forecast(&self, hours_ahead: u32) -> anyhow::Result<Forecast>;

    /// Which forecast models are trained and when
    async fn model_info(&self) -> anyhow::Result<ModelInfo>;

    /// One page of the history table, newest first
    async fn history(&self, limit: u32, offset: u32) -> anyhow::Result<HistoryPage>;
}
