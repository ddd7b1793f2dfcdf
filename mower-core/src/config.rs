use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::model::MowingWindow;

pub const APPLICATION_KEY_ENV: &str = "MOWER_APPLICATION_KEY";
pub const APPLICATION_SECRET_ENV: &str = "MOWER_APPLICATION_SECRET";

/// Open-Meteo keeps roughly 92 days of past forecasts.
pub const MAX_PAST_HOURS: i64 = 92 * 24;
/// Open-Meteo forecasts at most 16 days ahead.
pub const MAX_FORECAST_HOURS: i64 = 16 * 24;

/// Credentials for the Automower Connect API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HusqvarnaConfig {
    pub application_key: String,
    pub application_secret: String,
}

/// Where the lawn is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// First local hour mowing is allowed.
    pub mowing_start_hour: u32,
    /// Local hour mowing stops (exclusive).
    pub mowing_end_hour: u32,
    /// Past weather must score strictly above this to count as good.
    pub good_weather_threshold: f64,
    pub past_hours: i64,
    pub forecast_hours: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let window = MowingWindow::default();
        Self {
            mowing_start_hour: window.start_hour,
            mowing_end_hour: window.end_hour,
            good_weather_threshold: 0.75,
            past_hours: 48,
            forecast_hours: 24,
        }
    }
}

impl ScheduleConfig {
    pub fn mowing_window(&self) -> MowingWindow {
        MowingWindow {
            start_hour: self.mowing_start_hour,
            end_hour: self.mowing_end_hour,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [husqvarna]
/// application_key = "..."
/// application_secret = "..."
///
/// [location]
/// latitude = 59.33
/// longitude = 18.06
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub husqvarna: HusqvarnaConfig,
    pub location: LocationConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "mower-control", "mower")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay credentials from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v: &String| !v.is_empty());

        if let Some(key) = non_empty(APPLICATION_KEY_ENV) {
            self.husqvarna.application_key = key;
        }
        if let Some(secret) = non_empty(APPLICATION_SECRET_ENV) {
            self.husqvarna.application_secret = secret;
        }
    }

    /// Checks everything the control loop needs before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.husqvarna.application_key.is_empty() || self.husqvarna.application_secret.is_empty()
        {
            bail!(
                "No Husqvarna application key/secret configured.\n\
                 Hint: run `mower configure` or set {APPLICATION_KEY_ENV} and {APPLICATION_SECRET_ENV}."
            );
        }

        let LocationConfig {
            latitude,
            longitude,
        } = self.location;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            bail!("Location {latitude},{longitude} is out of range");
        }

        let schedule = &self.schedule;
        if schedule.mowing_start_hour >= schedule.mowing_end_hour || schedule.mowing_end_hour > 24 {
            bail!(
                "Mowing window {}..{} must be a non-empty range of hours within 0..24",
                schedule.mowing_start_hour,
                schedule.mowing_end_hour
            );
        }
        if !(-1.0..=1.0).contains(&schedule.good_weather_threshold) {
            bail!(
                "good_weather_threshold {} must be within -1..1",
                schedule.good_weather_threshold
            );
        }
        if schedule.past_hours <= 0 || schedule.forecast_hours <= 0 {
            bail!("past_hours and forecast_hours must be positive");
        }
        if schedule.past_hours > MAX_PAST_HOURS {
            bail!(
                "past_hours {} exceeds the {MAX_PAST_HOURS} hours of history available",
                schedule.past_hours
            );
        }
        if schedule.forecast_hours > MAX_FORECAST_HOURS {
            bail!(
                "forecast_hours {} exceeds the {MAX_FORECAST_HOURS} hour forecast horizon",
                schedule.forecast_hours
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn configured() -> Config {
        let mut cfg = Config::default();
        cfg.husqvarna.application_key = "KEY".into();
        cfg.husqvarna.application_secret = "SECRET".into();
        cfg.location = LocationConfig {
            latitude: 59.33,
            longitude: 18.06,
        };
        cfg
    }

    #[test]
    fn default_config_fails_validation_without_credentials() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("No Husqvarna application key/secret"));
        assert!(err.to_string().contains("Hint: run `mower configure`"));
    }

    #[test]
    fn configured_config_is_valid() {
        configured().validate().expect("config should be valid");
    }

    #[test]
    fn rejects_out_of_range_location() {
        let mut cfg = configured();
        cfg.location.latitude = 91.0;
        assert!(cfg.validate().unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn rejects_inverted_mowing_window() {
        let mut cfg = configured();
        cfg.schedule.mowing_start_hour = 17;
        cfg.schedule.mowing_end_hour = 9;
        assert!(cfg.validate().unwrap_err().to_string().contains("Mowing window"));
    }

    #[test]
    fn rejects_unbounded_history_and_forecast() {
        let mut cfg = configured();
        cfg.schedule.past_hours = i64::MAX;
        assert!(cfg.validate().unwrap_err().to_string().contains("past_hours"));

        let mut cfg = configured();
        cfg.schedule.forecast_hours = MAX_FORECAST_HOURS + 1;
        assert!(cfg.validate().unwrap_err().to_string().contains("forecast_hours"));

        let mut cfg = configured();
        cfg.schedule.past_hours = MAX_PAST_HOURS;
        cfg.schedule.forecast_hours = MAX_FORECAST_HOURS;
        cfg.validate().expect("limits themselves are allowed");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [husqvarna]
            application_key = "KEY"

            [schedule]
            mowing_end_hour = 20
            "#,
        )
        .unwrap();

        assert_eq!(cfg.husqvarna.application_key, "KEY");
        assert_eq!(cfg.husqvarna.application_secret, "");
        assert_eq!(cfg.schedule.mowing_start_hour, 9);
        assert_eq!(cfg.schedule.mowing_end_hour, 20);
        assert_eq!(cfg.schedule.good_weather_threshold, 0.75);
        assert_eq!(cfg.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn overrides_replace_credentials_but_ignore_empty_values() {
        let mut cfg = configured();
        let env: HashMap<&str, &str> =
            HashMap::from([(APPLICATION_KEY_ENV, "ENV_KEY"), (APPLICATION_SECRET_ENV, "")]);

        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.husqvarna.application_key, "ENV_KEY");
        assert_eq!(cfg.husqvarna.application_secret, "SECRET");
    }

    #[test]
    fn save_and_load_roundtrip_through_file() {
        let path = std::env::temp_dir()
            .join(format!("mower-config-test-{}", std::process::id()))
            .join("config.toml");

        let cfg = configured();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        let _ = fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(loaded.husqvarna.application_key, "KEY");
        assert_eq!(loaded.location, cfg.location);
        assert_eq!(loaded.schedule, cfg.schedule);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("mower-config-does-not-exist.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(cfg.husqvarna.application_key.is_empty());
    }
}
