// Dashboard service - Refresh jobs for each dashboard panel (fetch -> transform -> render)
use crate::application::refresh_orchestrator::{Orchestrator, RefreshJob, TaskSpec};
use crate::application::renderer::{draw_bar_chart, draw_line_chart, draw_mini_chart};
use crate::application::telemetry_repository::TelemetryRepository;
use crate::application::view_context::ViewContext;
use crate::domain::chart::{ChartConfig, Rgb, Theme};
use crate::domain::dashboard::{ChartKind, PanelSnapshot, RenderedChart};
use crate::domain::readings::{ForecastPoint, Reading};
use crate::domain::sensor::{Sensor, TimeRange};
use crate::domain::telemetry::{BarDatum, SeriesPoint, SeriesStats};
use crate::infrastructure::config::{ChartSettings, DashboardConfig, RefreshSettings};
use crate::infrastructure::svg_surface::SvgSurface;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

pub const REALTIME: &str = "realtime";
pub const STATUS: &str = "status";
pub const CHARTS: &str = "charts";
pub const HISTORY: &str = "history";
pub const FORECAST: &str = "forecast";

const STATUS_COLOR: Rgb = Rgb::new(0x48, 0xbb, 0x78);
const OUTLOOK_DAYS: usize = 7;
const OUTLOOK_HOURS: u32 = 24 * OUTLOOK_DAYS as u32;

/// Chart sizes and colors shared by every panel
#[derive(Debug, Clone)]
pub struct ChartLayout {
    width: f64,
    height: f64,
    padding: f64,
    sparkline_width: f64,
    sparkline_height: f64,
    max_labels: Option<usize>,
    palette: BTreeMap<Sensor, Rgb>,
}

impl ChartLayout {
    pub fn from_settings(settings: &ChartSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            padding: settings.padding,
            sparkline_width: settings.sparkline_width,
            sparkline_height: settings.sparkline_height,
            max_labels: settings.max_labels,
            palette: settings.palette(),
        }
    }

    fn color(&self, sensor: Sensor) -> Rgb {
        self.palette.get(&sensor).copied().unwrap_or_else(|| sensor.default_color())
    }

    fn config(&self, color: Rgb, theme: Theme) -> ChartConfig {
        let config = ChartConfig::responsive(self.width, self.height, color, theme).with_padding(self.padding);
        match self.max_labels {
            Some(max_labels) => config.with_max_labels(max_labels),
            None => config,
        }
    }

    fn line(
        &self,
        id: &str,
        title: &str,
        points: &[SeriesPoint],
        color: Rgb,
        theme: Theme,
    ) -> anyhow::Result<RenderedChart> {
        let mut surface = SvgSurface::new(self.width, self.height);
        draw_line_chart(&mut surface, points, &self.config(color, theme));
        if surface.is_blank() {
            tracing::debug!(chart = id, points = points.len(), "no drawable values");
        }
        Ok(RenderedChart::new(id, title, ChartKind::Line, surface.finish()?))
    }

    fn bar(&self, id: &str, title: &str, bars: &[BarDatum], color: Rgb, theme: Theme) -> anyhow::Result<RenderedChart> {
        let mut surface = SvgSurface::new(self.width, self.height);
        draw_bar_chart(&mut surface, bars, &self.config(color, theme));
        Ok(RenderedChart::new(id, title, ChartKind::Bar, surface.finish()?))
    }

    fn mini(&self, id: &str, title: &str, points: &[SeriesPoint], color: Rgb) -> anyhow::Result<RenderedChart> {
        let config = ChartConfig::responsive(self.sparkline_width, self.sparkline_height, color, Theme::Light)
            .with_padding(0.0);
        let mut surface = SvgSurface::new(self.sparkline_width, self.sparkline_height);
        draw_mini_chart(&mut surface, points, &config);
        Ok(RenderedChart::new(id, title, ChartKind::Mini, surface.finish()?))
    }
}

/// Latest reading plus a sparkline per sensor over a rolling window
pub struct RealtimePanel {
    repository: Arc<dyn TelemetryRepository>,
    layout: ChartLayout,
    window: usize,
    recent: Mutex<BTreeMap<Sensor, VecDeque<SeriesPoint>>>,
}

impl RealtimePanel {
    pub fn new(repository: Arc<dyn TelemetryRepository>, layout: ChartLayout, window: usize) -> Self {
        Self {
            repository,
            layout,
            window: window.max(1),
            recent: Mutex::new(BTreeMap::new()),
        }
    }

    fn record(&self, reading: &Reading) -> BTreeMap<Sensor, Vec<SeriesPoint>> {
        let timestamp = reading
            .timestamp
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());

        for (sensor, value) in &reading.values {
            let samples = recent.entry(*sensor).or_default();
            // The backend repeats the last reading until a new one arrives
            if samples.back().is_some_and(|last| last.timestamp == timestamp) {
                continue;
            }
            samples.push_back(SeriesPoint::new(timestamp, *value));
            while samples.len() > self.window {
                samples.pop_front();
            }
        }

        recent
            .iter()
            .map(|(sensor, samples)| (*sensor, samples.iter().cloned().collect()))
            .collect()
    }
}

#[async_trait]
impl RefreshJob for RealtimePanel {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
        let reading = self.repository.realtime_reading().await?;
        let recent = self.record(&reading);

        let charts = recent
            .iter()
            .map(|(sensor, points)| {
                let title = match sensor.unit() {
                    "" => sensor.display_name().to_string(),
                    unit => format!("{} ({})", sensor.display_name(), unit),
                };
                self.layout
                    .mini(sensor.key(), &title, points, self.layout.color(*sensor))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let reading = serde_json::to_value(&reading)?;
        Ok(PanelSnapshot::new(REALTIME, serde_json::json!({ "reading": reading }), charts))
    }
}

/// System statistics with a bar chart of record counts
pub struct StatusPanel {
    repository: Arc<dyn TelemetryRepository>,
    view: Arc<ViewContext>,
    layout: ChartLayout,
}

impl StatusPanel {
    pub fn new(repository: Arc<dyn TelemetryRepository>, view: Arc<ViewContext>, layout: ChartLayout) -> Self {
        Self {
            repository,
            view,
            layout,
        }
    }
}

#[async_trait]
impl RefreshJob for StatusPanel {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
        let stats = self.repository.system_stats().await?;

        let bars = [
            BarDatum::new("Sensor", stats.sensor_records as f64),
            BarDatum::new("Weather", stats.weather_records as f64),
            BarDatum::new("Today", stats.records_today as f64),
        ];
        let chart = self
            .layout
            .bar("records", "Records", &bars, STATUS_COLOR, self.view.theme())?;

        Ok(PanelSnapshot::new(STATUS, serde_json::to_value(&stats)?, vec![chart]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFilter {
    pub time_range: TimeRange,
    pub sensors: Vec<Sensor>,
}

/// One line chart per selected sensor over the selected time range
pub struct ChartsPanel {
    repository: Arc<dyn TelemetryRepository>,
    view: Arc<ViewContext>,
    layout: ChartLayout,
    max_points: usize,
    filter: RwLock<ChartFilter>,
}

impl ChartsPanel {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        view: Arc<ViewContext>,
        layout: ChartLayout,
        max_points: usize,
        filter: ChartFilter,
    ) -> Self {
        Self {
            repository,
            view,
            layout,
            max_points,
            filter: RwLock::new(filter),
        }
    }

    pub fn filter(&self) -> ChartFilter {
        self.filter.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_filter(&self, filter: ChartFilter) -> anyhow::Result<()> {
        anyhow::ensure!(!filter.sensors.is_empty(), "select at least one sensor");
        *self.filter.write().unwrap_or_else(|e| e.into_inner()) = filter;
        Ok(())
    }
}

#[async_trait]
impl RefreshJob for ChartsPanel {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
        let filter = self.filter();
        let series = self
            .repository
            .chart_series(filter.time_range, &filter.sensors)
            .await?;

        anyhow::ensure!(
            series.iter().any(|s| !s.points.is_empty()),
            "no chart data for {}",
            filter.time_range.as_query()
        );

        let theme = self.view.theme();
        let mut charts = Vec::with_capacity(series.len());
        let mut stats: BTreeMap<String, SeriesStats> = BTreeMap::new();

        for s in series {
            let s = s.downsample(self.max_points);
            let color = match s.id.parse::<Sensor>() {
                Ok(sensor) => self.layout.color(sensor),
                Err(_) => s
                    .color
                    .as_deref()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(STATUS_COLOR),
            };
            if let Some(summary) = s.stats() {
                stats.insert(s.id.clone(), summary);
            }
            charts.push(self.layout.line(&s.id, &s.name, &s.points, color, theme)?);
        }

        let data = serde_json::json!({
            "filter": serde_json::to_value(&filter)?,
            "stats": serde_json::to_value(&stats)?,
        });
        Ok(PanelSnapshot::new(CHARTS, data, charts))
    }
}

/// Current page of the paginated history table
pub struct HistoryPanel {
    repository: Arc<dyn TelemetryRepository>,
    page_size: u32,
    page: AtomicU32,
}

impl HistoryPanel {
    pub fn new(repository: Arc<dyn TelemetryRepository>, page_size: u32) -> Self {
        Self {
            repository,
            page_size: page_size.max(1),
            page: AtomicU32::new(0),
        }
    }

    pub fn page(&self) -> u32 {
        self.page.load(Ordering::Acquire)
    }

    pub fn set_page(&self, page: u32) {
        self.page.store(page, Ordering::Release);
    }
}

#[async_trait]
impl RefreshJob for HistoryPanel {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
        let page = self.page();
        let offset = page.saturating_mul(self.page_size);
        let records = self.repository.history(self.page_size, offset).await?;

        let total_pages = records.total.div_ceil(self.page_size as u64);
        let data = serde_json::json!({
            "page": page,
            "total_pages": total_pages,
            "table": serde_json::to_value(&records)?,
        });
        Ok(PanelSnapshot::new(HISTORY, data, Vec::new()))
    }
}

/// Temperature and humidity forecast charts, a seven-day outlook and the model status
pub struct ForecastPanel {
    repository: Arc<dyn TelemetryRepository>,
    view: Arc<ViewContext>,
    layout: ChartLayout,
    hours_ahead: u32,
}

impl ForecastPanel {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        view: Arc<ViewContext>,
        layout: ChartLayout,
        hours_ahead: u32,
    ) -> Self {
        Self {
            repository,
            view,
            layout,
            hours_ahead,
        }
    }
}

fn forecast_series(points: &[ForecastPoint], value: impl Fn(&ForecastPoint) -> f64) -> Vec<SeriesPoint> {
    points
        .iter()
        .map(|p| SeriesPoint::new(p.timestamp, value(p)))
        .collect()
}

#[async_trait]
impl RefreshJob for ForecastPanel {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
        let (forecast, week) = tokio::try_join!(
            self.repository.forecast(self.hours_ahead),
            self.repository.forecast(OUTLOOK_HOURS),
        )?;
        // The outlook still renders when model status is unavailable
        let model = match self.repository.model_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(error = %e, "model info unavailable");
                None
            }
        };
        let theme = self.view.theme();

        let charts = vec![
            self.layout.line(
                Sensor::Temperature.key(),
                "Temperature forecast",
                &forecast_series(&forecast.points, |p| p.temperature),
                self.layout.color(Sensor::Temperature),
                theme,
            )?,
            self.layout.line(
                Sensor::Humidity.key(),
                "Humidity forecast",
                &forecast_series(&forecast.points, |p| p.humidity),
                self.layout.color(Sensor::Humidity),
                theme,
            )?,
        ];

        let mut data = serde_json::to_value(&forecast)?;
        data["outlook"] = serde_json::to_value(week.daily_outlook(OUTLOOK_DAYS))?;
        data["model"] = serde_json::to_value(&model)?;
        Ok(PanelSnapshot::new(FORECAST, data, charts))
    }

    fn success_message(&self) -> Option<String> {
        Some("Forecast updated".to_string())
    }
}

/// Owns the panel jobs; the charts and history panels stay reachable for filter and page changes
pub struct DashboardService {
    pub realtime: Arc<RealtimePanel>,
    pub status: Arc<StatusPanel>,
    pub charts: Arc<ChartsPanel>,
    pub history: Arc<HistoryPanel>,
    pub forecast: Arc<ForecastPanel>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn TelemetryRepository>, view: Arc<ViewContext>, config: &DashboardConfig) -> Self {
        let charts = &config.charts;
        let layout = ChartLayout::from_settings(charts);
        let filter = ChartFilter {
            time_range: charts.time_range,
            sensors: charts.sensors.clone(),
        };

        Self {
            realtime: Arc::new(RealtimePanel::new(
                repository.clone(),
                layout.clone(),
                charts.sparkline_window,
            )),
            status: Arc::new(StatusPanel::new(repository.clone(), view.clone(), layout.clone())),
            charts: Arc::new(ChartsPanel::new(
                repository.clone(),
                view.clone(),
                layout.clone(),
                charts.max_points,
                filter,
            )),
            history: Arc::new(HistoryPanel::new(repository.clone(), charts.history_page_size)),
            forecast: Arc::new(ForecastPanel::new(repository, view, layout, charts.forecast_hours)),
        }
    }

    pub fn register(&self, orchestrator: &mut Orchestrator, refresh: &RefreshSettings) {
        let timeout = refresh.fetch_timeout();
        let spec = |name: &str, ms: u64| TaskSpec::new(name, Duration::from_millis(ms)).with_timeout(timeout);

        orchestrator.register(spec(REALTIME, refresh.realtime_ms), self.realtime.clone());
        orchestrator.register(spec(STATUS, refresh.status_ms), self.status.clone());
        orchestrator.register(spec(CHARTS, refresh.charts_ms), self.charts.clone());
        orchestrator.register(spec(HISTORY, refresh.history_ms), self.history.clone());
        orchestrator.register(spec(FORECAST, refresh.forecast_ms), self.forecast.clone());
    }
}
