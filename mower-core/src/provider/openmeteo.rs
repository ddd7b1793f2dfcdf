use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    codes,
    error::{ApiError, Result},
    http::{DEFAULT_TIMEOUT, build_client, checked_body, decode},
    model::{CurrentWeather, WeatherSample},
};

use super::WeatherProvider;

const SERVICE: &str = "Open-Meteo";
const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    latitude: f64,
    longitude: f64,
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        Self::with_base_url(latitude, longitude, DEFAULT_BASE_URL.to_string(), DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        latitude: f64,
        longitude: f64,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            latitude,
            longitude,
            base_url,
            http: build_client(timeout)?,
        })
    }

    fn request(&self, extra: &[(&str, String)]) -> RequestBuilder {
        let url = format!("{}/forecast", self.base_url);
        let mut query = vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        self.http.get(url).query(&query)
    }

    async fn get(&self, extra: &[(&str, String)]) -> Result<String> {
        let res = self
            .request(extra)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                service: SERVICE,
                source,
            })?;

        checked_body(SERVICE, res).await
    }
}

fn hourly_query(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 3] {
    [
        ("start_date", start.format("%Y-%m-%d").to_string()),
        ("end_date", end.format("%Y-%m-%d").to_string()),
        ("hourly", "weathercode".to_string()),
    ]
}

fn current_query() -> [(&'static str, String); 1] {
    [("current_weather", "true".to_string())]
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    weathercode: Vec<Option<u16>>,
}

#[derive(Debug, Deserialize)]
struct OmHourlyResponse {
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: String,
    temperature: f64,
    windspeed: f64,
    weathercode: u16,
}

#[derive(Debug, Deserialize)]
struct OmCurrentResponse {
    current_weather: OmCurrent,
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map(|ndt| ndt.and_utc())
        .map_err(|_| ApiError::Timestamp(s.to_string()))
}

/// Hours the model has not filled in yet come back as `null` and are skipped.
fn parse_hourly(body: &str) -> Result<Vec<WeatherSample>> {
    let parsed: OmHourlyResponse = decode(SERVICE, body)?;
    let OmHourly { time, weathercode } = parsed.hourly;

    if time.len() != weathercode.len() {
        return Err(ApiError::Mismatched {
            times: time.len(),
            codes: weathercode.len(),
        });
    }

    time.iter()
        .zip(weathercode)
        .filter_map(|(t, code)| code.map(|code| (t, code)))
        .map(|(t, code)| parse_time(t).map(|utc_time| WeatherSample::new(utc_time, code)))
        .collect()
}

fn parse_current(body: &str) -> Result<CurrentWeather> {
    let parsed: OmCurrentResponse = decode(SERVICE, body)?;
    let current = parsed.current_weather;
    let (description, _) = codes::describe(current.weathercode);

    Ok(CurrentWeather {
        time: parse_time(&current.time)?,
        weather_code: current.weathercode,
        description: description.to_string(),
        temperature_c: current.temperature,
        wind_speed_kmh: current.windspeed,
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn hourly(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherSample>> {
        tracing::debug!(%start, %end, "fetching hourly weather");
        let body = self.get(&hourly_query(start, end)).await?;
        parse_hourly(&body)
    }

    async fn current(&self) -> Result<CurrentWeather> {
        tracing::debug!("fetching current weather");
        let body = self.get(&current_query()).await?;
        parse_current(&body)
    }
}
