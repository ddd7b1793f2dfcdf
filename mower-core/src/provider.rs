use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;

use crate::{
    error::Result,
    model::{CurrentWeather, WeatherSample},
};

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Source of hourly weather codes for a fixed location.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Hourly samples for every hour of the inclusive UTC date range.
    async fn hourly(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherSample>>;

    async fn current(&self) -> Result<CurrentWeather>;
}
