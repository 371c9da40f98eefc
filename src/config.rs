use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::mission::MissionSettings;
use crate::vehicle::Navigator;

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub broker: BrokerConfig,
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub station: StationConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    pub vehicle_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_keep_alive() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleDriverKind {
    Mavlink,
    Simulated,
}

#[derive(Debug, Deserialize)]
pub struct VehicleConfig {
    pub driver: VehicleDriverKind,
    pub connection_string: String,
    pub mode: String,
    pub altitude: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub chunk_size: f64,
    pub grid_size: f64,
    pub arrival_radius_m: f64,
    pub poll_interval_ms: u64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            chunk_size: 0.001,
            grid_size: 0.0002,
            arrival_radius_m: 1.0,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub advise_on_completion: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let config_path = format!("config/{}.toml", env);
        let fallback_path = format!("/etc/fieldscan/{}.toml", env);

        let path = if Path::new(&config_path).exists() {
            config_path
        } else {
            fallback_path
        };
        Self::from_file(&path)
    }

    /// Load `path`, with `FIELDSCAN__SECTION__KEY` variables taking precedence.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FIELDSCAN").separator("__"))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;
        let config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn mission_settings(&self) -> MissionSettings {
        MissionSettings {
            chunk_size: self.survey.chunk_size,
            grid_size: self.survey.grid_size,
            altitude: self.vehicle.altitude,
            mode: self.vehicle.mode.clone(),
        }
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(
            self.survey.arrival_radius_m,
            Duration::from_millis(self.survey.poll_interval_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[general]
log_level = "info"
vehicle_id = "255"

[broker]
host = "localhost"
port = 1883

[vehicle]
driver = "simulated"
connection_string = "udpin:0.0.0.0:14550"
mode = "GUIDED"
altitude = 10.0

[survey]
grid_size = 0.0005
"#;

    #[test]
    fn test_from_file_applies_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        file.write_all(SAMPLE.as_bytes())?;
        let path = file.path().to_string_lossy().to_string();

        let config = Config::from_file(&path)?;
        assert_eq!(config.general.vehicle_id, "255");
        assert_eq!(config.vehicle.driver, VehicleDriverKind::Simulated);
        assert_eq!(config.broker.keep_alive_secs, 5);
        assert_eq!(config.survey.chunk_size, 0.001);
        assert_eq!(config.survey.grid_size, 0.0005);
        assert_eq!(config.telemetry.interval_ms, 1000);
        assert!(!config.station.advise_on_completion);

        let settings = config.mission_settings();
        assert_eq!(settings.mode, "GUIDED");
        assert_eq!(config.navigator().poll_interval, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::from_file("/nonexistent/fieldscan.toml").is_err());
    }
}
