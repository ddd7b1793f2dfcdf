use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precipitation severity attached to a weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Dry,
    Slight,
    Moderate,
    Heavy,
    #[serde(rename = "Very Heavy")]
    VeryHeavy,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Dry => "Dry",
            Intensity::Slight => "Slight",
            Intensity::Moderate => "Moderate",
            Intensity::Heavy => "Heavy",
            Intensity::VeryHeavy => "Very Heavy",
        }
    }

    pub fn is_dry(&self) -> bool {
        matches!(self, Intensity::Dry)
    }

    /// Multiplier applied to a sample's weight when it is not dry.
    pub fn weight(&self) -> f64 {
        match self {
            Intensity::Dry => 1.0,
            Intensity::Slight => 0.75,
            Intensity::Moderate => 0.5,
            Intensity::Heavy => 0.25,
            Intensity::VeryHeavy => 0.1,
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One hourly observation or forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub utc_time: DateTime<Utc>,
    pub weather_code: u16,
    pub description: String,
    pub intensity: Intensity,
}

impl WeatherSample {
    pub fn new(utc_time: DateTime<Utc>, weather_code: u16) -> Self {
        let (description, intensity) = crate::codes::describe(weather_code);
        Self {
            utc_time,
            weather_code,
            description: description.to_string(),
            intensity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub time: DateTime<Utc>,
    pub weather_code: u16,
    pub description: String,
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MowerRef {
    pub id: String,
    pub name: String,
}

/// Command understood by the mower vendor's action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MowerCommand {
    ResumeSchedule,
    ParkUntilFurtherNotice,
}

impl MowerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MowerCommand::ResumeSchedule => "ResumeSchedule",
            MowerCommand::ParkUntilFurtherNotice => "ParkUntilFurtherNotice",
        }
    }
}

impl fmt::Display for MowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one control cycle; also the reason the mowers were parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Resume,
    Rain,
    Weather,
    Time,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Resume => "Resume",
            Action::Rain => "Rain",
            Action::Weather => "Weather",
            Action::Time => "Time",
        }
    }

    pub fn command(&self) -> MowerCommand {
        match self {
            Action::Resume => MowerCommand::ResumeSchedule,
            Action::Rain | Action::Weather | Action::Time => MowerCommand::ParkUntilFurtherNotice,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What the controller would do during a forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastAction {
    Resume,
    Pause,
    Time,
}

impl ForecastAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastAction::Resume => "Resume",
            ForecastAction::Pause => "Pause",
            ForecastAction::Time => "Time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub utc_time: DateTime<Utc>,
    pub local_time: String,
    pub weather_code: u16,
    pub description: String,
    pub intensity: Intensity,
    pub weight: f64,
    pub good_weather: bool,
    pub action: ForecastAction,
}

/// Local hours `[start_hour, end_hour)` during which mowing is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MowingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl MowingWindow {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

impl Default for MowingWindow {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
        }
    }
}

/// Everything computed by one successful control cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionState {
    pub currently_raining: bool,
    pub good_weather: bool,
    pub weather_score: f64,
    pub forecast_analysis: Vec<ForecastEntry>,
    pub current_action: Action,
}
