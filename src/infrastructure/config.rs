use crate::domain::chart::{Rgb, Theme};
use crate::domain::sensor::{Sensor, TimeRange};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub refresh: RefreshSettings,
    pub charts: ChartSettings,
    pub view: ViewSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Per-panel polling cadence, in milliseconds
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshSettings {
    pub realtime_ms: u64,
    pub status_ms: u64,
    pub charts_ms: u64,
    pub history_ms: u64,
    pub forecast_ms: u64,
    pub fetch_timeout_ms: u64,
    pub notification_cooldown_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            realtime_ms: 5_000,
            status_ms: 10_000,
            charts_ms: 10_000,
            history_ms: 15_000,
            forecast_ms: 30_000,
            fetch_timeout_ms: 10_000,
            notification_cooldown_secs: 60,
        }
    }
}

impl RefreshSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn notification_cooldown(&self) -> Duration {
        Duration::from_secs(self.notification_cooldown_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub sparkline_width: f64,
    pub sparkline_height: f64,
    pub sparkline_window: usize,
    pub max_points: usize,
    /// Caps X axis labels on full-size charts; unset follows the chart width
    pub max_labels: Option<usize>,
    pub time_range: TimeRange,
    pub sensors: Vec<Sensor>,
    pub forecast_hours: u32,
    pub history_page_size: u32,
    /// Sensor key to `#rrggbb`, overriding the built-in palette
    pub colors: HashMap<String, String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
            padding: 50.0,
            sparkline_width: 120.0,
            sparkline_height: 40.0,
            sparkline_window: 30,
            max_points: 150,
            max_labels: None,
            time_range: TimeRange::Last24Hours,
            sensors: vec![Sensor::Temperature, Sensor::Humidity, Sensor::Pressure],
            forecast_hours: 24,
            history_page_size: 50,
            colors: HashMap::new(),
        }
    }
}

impl ChartSettings {
    /// Built-in palette with the configured overrides applied
    pub fn palette(&self) -> BTreeMap<Sensor, Rgb> {
        let mut palette: BTreeMap<Sensor, Rgb> =
            Sensor::ALL.iter().map(|s| (*s, s.default_color())).collect();

        for (key, hex) in &self.colors {
            match (key.parse::<Sensor>(), hex.parse::<Rgb>()) {
                (Ok(sensor), Ok(color)) => {
                    palette.insert(sensor, color);
                }
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(sensor = %key, error = %e, "ignoring chart color override");
                }
            }
        }

        palette
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ViewSettings {
    pub theme: Theme,
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("realtime_ms", self.refresh.realtime_ms),
            ("status_ms", self.refresh.status_ms),
            ("charts_ms", self.refresh.charts_ms),
            ("history_ms", self.refresh.history_ms),
            ("forecast_ms", self.refresh.forecast_ms),
            ("fetch_timeout_ms", self.refresh.fetch_timeout_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("refresh.{} must be greater than zero", name)));
        }

        if self.charts.width <= 2.0 * self.charts.padding || self.charts.height <= 2.0 * self.charts.padding {
            return Err(ConfigError::Invalid(
                "charts.width and charts.height must exceed twice the padding".to_string(),
            ));
        }

        if self.charts.sensors.is_empty() {
            return Err(ConfigError::Invalid("charts.sensors must name at least one sensor".to_string()));
        }

        Ok(())
    }
}

/// Load `config/dashboard.{toml,yaml,json}` if present, then `DASHBOARD__*` overrides
pub fn load_dashboard_config() -> Result<DashboardConfig, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("charts.sensors")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_match_panel_cadences() {
        let config = from_toml("");
        assert_eq!(config.refresh.realtime_ms, 5_000);
        assert_eq!(config.refresh.charts_ms, 10_000);
        assert_eq!(config.refresh.history_ms, 15_000);
        assert_eq!(config.refresh.forecast_ms, 30_000);
        assert_eq!(config.refresh.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.view.theme, Theme::Light);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_file() {
        let config = from_toml(
            r##"
            [refresh]
            charts_ms = 20000

            [charts]
            time_range = "today"
            sensors = ["co2", "dust"]
            colors = { co2 = "#000000" }

            [view]
            theme = "dark"
            "##,
        );

        assert_eq!(config.refresh.charts_ms, 20_000);
        assert_eq!(config.charts.time_range, TimeRange::Last24Hours);
        assert_eq!(config.charts.sensors, vec![Sensor::Co2, Sensor::Dust]);
        assert_eq!(config.view.theme, Theme::Dark);
        assert_eq!(config.charts.palette()[&Sensor::Co2], Rgb::new(0, 0, 0));
        assert_eq!(config.charts.palette()[&Sensor::Dust], Sensor::Dust.default_color());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = from_toml("[refresh]\nstatus_ms = 0\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_padding_must_fit() {
        let config = from_toml("[charts]\nwidth = 90.0\npadding = 50.0\n");
        assert!(config.validate().is_err());
    }
}
