// Sensor catalogue shared by the realtime, charts and forecast panels
use crate::domain::chart::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    Temperature,
    Humidity,
    Pressure,
    Co2,
    Dust,
    Aqi,
    WindSpeed,
    Rainfall,
    UvIndex,
}

impl Sensor {
    pub const ALL: [Sensor; 9] = [
        Sensor::Temperature,
        Sensor::Humidity,
        Sensor::Pressure,
        Sensor::Co2,
        Sensor::Dust,
        Sensor::Aqi,
        Sensor::WindSpeed,
        Sensor::Rainfall,
        Sensor::UvIndex,
    ];

    /// Key used by the backend payloads
    pub fn key(self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Humidity => "humidity",
            Sensor::Pressure => "pressure",
            Sensor::Co2 => "co2",
            Sensor::Dust => "dust",
            Sensor::Aqi => "aqi",
            Sensor::WindSpeed => "wind_speed",
            Sensor::Rainfall => "rainfall",
            Sensor::UvIndex => "uv_index",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sensor::Temperature => "Temperature",
            Sensor::Humidity => "Humidity",
            Sensor::Pressure => "Pressure",
            Sensor::Co2 => "CO2",
            Sensor::Dust => "Dust",
            Sensor::Aqi => "AQI",
            Sensor::WindSpeed => "Wind speed",
            Sensor::Rainfall => "Rainfall",
            Sensor::UvIndex => "UV index",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Sensor::Temperature => "°C",
            Sensor::Humidity => "%",
            Sensor::Pressure => "hPa",
            Sensor::Co2 => "ppm",
            Sensor::Dust => "µg/m³",
            Sensor::Aqi => "",
            Sensor::WindSpeed => "km/h",
            Sensor::Rainfall => "mm",
            Sensor::UvIndex => "",
        }
    }

    pub fn default_color(self) -> Rgb {
        match self {
            Sensor::Temperature => Rgb::new(0xf5, 0x65, 0x65),
            Sensor::Humidity | Sensor::Rainfall => Rgb::new(0x42, 0x99, 0xe1),
            Sensor::Pressure => Rgb::new(0x48, 0xbb, 0x78),
            Sensor::Co2 => Rgb::new(0xed, 0x89, 0x36),
            Sensor::Dust => Rgb::new(0x9f, 0x7a, 0xea),
            Sensor::Aqi | Sensor::UvIndex => Rgb::new(0xec, 0xc9, 0x4b),
            Sensor::WindSpeed => Rgb::new(0x38, 0xb2, 0xac),
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Sensor::ALL
            .iter()
            .copied()
            .find(|sensor| sensor.key() == key)
            .ok_or_else(|| format!("unknown sensor '{}'", key))
    }
}

/// Time window requested from the charts endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
}

impl TimeRange {
    /// `today`, `custom` and anything unrecognised fall back to 24h
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim() {
            "7d" => TimeRange::Last7Days,
            "30d" => TimeRange::Last30Days,
            _ => TimeRange::Last24Hours,
        }
    }

    pub fn as_query(self) -> &'static str {
        match self {
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
        }
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TimeRange::parse_lenient(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_round_trip_keys() {
        for sensor in Sensor::ALL {
            assert_eq!(sensor.key().parse::<Sensor>().unwrap(), sensor);
        }
        assert!("lux".parse::<Sensor>().is_err());
    }

    #[test]
    fn test_time_range_fallback() {
        assert_eq!(TimeRange::parse_lenient("today"), TimeRange::Last24Hours);
        assert_eq!(TimeRange::parse_lenient("custom"), TimeRange::Last24Hours);
        assert_eq!(TimeRange::parse_lenient("7d"), TimeRange::Last7Days);
        assert_eq!(TimeRange::Last30Days.as_query(), "30d");
    }
}
