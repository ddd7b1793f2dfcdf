//! Time-weighted weather scoring.
//!
//! Each hourly sample gets a weight that grows linearly towards the end of
//! the series that matters most: the latest hour for past weather, the next
//! hour for a forecast. Wet samples count negatively, and their weight is
//! reduced according to [`Intensity::weight`](crate::model::Intensity::weight). The score is normalised by the
//! sum of the unscaled weights, so it lies in `[-1, 1]`.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use std::fmt::Display;

use crate::model::{ForecastAction, ForecastEntry, MowingWindow, WeatherSample};

/// Which end of a series carries the most weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Oldest sample first; the last sample is the most recent.
    Recency,
    /// Nearest sample first; the first sample is the most relevant.
    Proximity,
}

/// Linear position weight in `(0, 1]` for sample `index` of `len`.
pub fn position_weight(index: usize, len: usize, weighting: Weighting) -> f64 {
    if len == 0 {
        return 0.0;
    }
    let rank = match weighting {
        Weighting::Recency => index + 1,
        Weighting::Proximity => len - index,
    };
    rank as f64 / len as f64
}

/// Position weight scaled by the sample's intensity.
fn sample_weight(sample: &WeatherSample, index: usize, len: usize, weighting: Weighting) -> f64 {
    let weight = position_weight(index, len, weighting);
    if sample.intensity.is_dry() {
        weight
    } else {
        weight * sample.intensity.weight()
    }
}

/// Normalised weighted score of a series; `0.0` for an empty series.
pub fn weighted_score(samples: &[WeatherSample], weighting: Weighting) -> f64 {
    let len = samples.len();
    let mut score = 0.0;
    let mut max_score = 0.0;

    for (i, sample) in samples.iter().enumerate() {
        let weight = sample_weight(sample, i, len, weighting);
        if sample.intensity.is_dry() {
            score += weight;
        } else {
            score -= weight;
        }
        max_score += position_weight(i, len, weighting);
    }

    if max_score == 0.0 {
        0.0
    } else {
        score / max_score
    }
}

pub fn is_good_weather(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// Scores the past hours and logs the per-hour breakdown at debug level.
pub fn has_been_good_weather(samples: &[WeatherSample], threshold: f64) -> (f64, bool) {
    let len = samples.len();
    for (i, sample) in samples.iter().enumerate() {
        tracing::debug!(
            utc_time = %sample.utc_time.format("%Y-%m-%d %H:%M"),
            code = sample.weather_code,
            description = %sample.description,
            intensity = %sample.intensity,
            weight = sample_weight(sample, i, len, Weighting::Recency),
            "past weather sample"
        );
    }

    let score = weighted_score(samples, Weighting::Recency);
    let good = is_good_weather(score, threshold);
    tracing::info!(
        hours = len,
        score,
        good_weather = good,
        "analyzed past weather"
    );
    (score, good)
}

/// Builds the per-hour forecast table for hours strictly after `now`.
///
/// Proximity weights are computed over the upcoming hours only, so the next
/// hour always weighs 1. Weighting the whole fetched list instead would give
/// the first upcoming hour a lower weight whenever past hours are present.
pub fn analyze_forecast<Tz>(
    samples: &[WeatherSample],
    now: DateTime<Utc>,
    tz: &Tz,
    window: MowingWindow,
) -> Vec<ForecastEntry>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let upcoming: Vec<&WeatherSample> = samples.iter().filter(|s| s.utc_time > now).collect();
    let len = upcoming.len();

    upcoming
        .into_iter()
        .enumerate()
        .map(|(i, sample)| {
            let local = sample.utc_time.with_timezone(tz);
            let good_weather = sample.intensity.is_dry();
            let action = if !window.contains(local.hour()) {
                ForecastAction::Time
            } else if good_weather {
                ForecastAction::Resume
            } else {
                ForecastAction::Pause
            };

            ForecastEntry {
                utc_time: sample.utc_time,
                local_time: local.format("%d %B %I:%M %p").to_string(),
                weather_code: sample.weather_code,
                description: sample.description.clone(),
                intensity: sample.intensity,
                weight: sample_weight(sample, i, len, Weighting::Proximity),
                good_weather,
                action,
            }
        })
        .collect()
}
