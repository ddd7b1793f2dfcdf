//! The periodic fetch → score → act loop.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use std::{fmt::Display, sync::Arc, time::Duration as StdDuration};

use crate::{
    codes,
    config::Config,
    model::{Action, DecisionState, MowingWindow, WeatherSample},
    mower::MowerApi,
    provider::WeatherProvider,
    scoring,
    status::SharedStatus,
};

/// Cycles run at :00 and :30 past the hour.
const SLOT_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    pub window: MowingWindow,
    pub good_weather_threshold: f64,
    pub past_hours: i64,
    pub forecast_hours: i64,
    /// Decide and record, but never send commands.
    pub dry_run: bool,
}

impl ControlSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            window: config.schedule.mowing_window(),
            good_weather_threshold: config.schedule.good_weather_threshold,
            past_hours: config.schedule.past_hours,
            forecast_hours: config.schedule.forecast_hours,
            dry_run,
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self::from_config(&Config::default(), false)
    }
}

/// Picks the action for the current cycle. The mowing window wins over weather.
pub fn decide_action(in_window: bool, currently_raining: bool, good_weather: bool) -> Action {
    if !in_window {
        Action::Time
    } else if currently_raining {
        Action::Rain
    } else if good_weather {
        Action::Resume
    } else {
        Action::Weather
    }
}

/// Time left until the next half-hour boundary of `now`'s local clock.
pub fn until_next_slot<Tz: TimeZone>(now: &DateTime<Tz>) -> StdDuration {
    let into_slot = u64::from(now.minute() % 30) * 60 + u64::from(now.second());
    let nanos = u64::from(now.nanosecond() % 1_000_000_000);
    StdDuration::from_secs(SLOT_SECS - into_slot).saturating_sub(StdDuration::from_nanos(nanos))
}

/// Owns the decision state and drives the mowers.
pub struct Controller<Tz: TimeZone> {
    weather: Arc<dyn WeatherProvider>,
    mowers: Arc<dyn MowerApi>,
    settings: ControlSettings,
    tz: Tz,
    status: SharedStatus,
}

impl<Tz> Controller<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Display + Send + Sync,
{
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        mowers: Arc<dyn MowerApi>,
        settings: ControlSettings,
        tz: Tz,
    ) -> Self {
        Self {
            weather,
            mowers,
            settings,
            tz,
            status: SharedStatus::default(),
        }
    }

    /// Handle for readers of the last computed state.
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Runs one full cycle. The status snapshot is updated before any command is sent.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<DecisionState> {
        tracing::info!("starting control cycle");
        let settings = &self.settings;

        let past_from = now - Duration::hours(settings.past_hours);
        let past_weather: Vec<WeatherSample> = self
            .weather
            .hourly(past_from.date_naive(), now.date_naive())
            .await
            .context("Failed to fetch past weather")?
            .into_iter()
            .filter(|s| s.utc_time >= past_from && s.utc_time <= now)
            .collect();

        let current = self
            .weather
            .current()
            .await
            .context("Failed to fetch current weather")?;

        let forecast_until = now + Duration::hours(settings.forecast_hours);
        let forecast: Vec<WeatherSample> = self
            .weather
            .hourly(now.date_naive(), forecast_until.date_naive())
            .await
            .context("Failed to fetch weather forecast")?
            .into_iter()
            .filter(|s| s.utc_time <= forecast_until)
            .collect();

        let mowers = self
            .mowers
            .list_mowers()
            .await
            .context("Failed to fetch mowers")?;

        let currently_raining = codes::is_rain(current.weather_code);
        tracing::info!(
            code = current.weather_code,
            description = %current.description,
            currently_raining,
            "current weather"
        );
        let (weather_score, good_weather) =
            scoring::has_been_good_weather(&past_weather, settings.good_weather_threshold);
        let forecast_analysis = scoring::analyze_forecast(&forecast, now, &self.tz, settings.window);

        let local_hour = now.with_timezone(&self.tz).hour();
        let current_action = decide_action(
            settings.window.contains(local_hour),
            currently_raining,
            good_weather,
        );

        let decision = DecisionState {
            currently_raining,
            good_weather,
            weather_score,
            forecast_analysis,
            current_action,
        };

        self.status
            .update(|status| {
                status.mower_names = mowers.iter().map(|m| m.name.clone()).collect();
                status.current_weather = Some(current);
                status.past_weather = past_weather;
                status.decision = Some(decision.clone());
                status.updated_at = Some(now);
                status.last_error = None;
                status.dry_run = settings.dry_run;
            })
            .await;

        let command = current_action.command();
        tracing::info!(
            action = %current_action,
            %command,
            local_hour,
            mowers = mowers.len(),
            dry_run = settings.dry_run,
            "decided mower action"
        );

        if !settings.dry_run {
            for mower in &mowers {
                self.mowers
                    .send_command(&mower.id, command)
                    .await
                    .with_context(|| format!("Failed to send {command} to mower {}", mower.name))?;
            }
        }

        tracing::info!("control cycle completed");
        Ok(decision)
    }

    /// Runs one cycle, logging and recording any failure instead of returning it.
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<DecisionState> {
        match self.run_cycle(now).await {
            Ok(decision) => Some(decision),
            Err(err) => {
                tracing::error!("control cycle failed: {err:#}");
                let message = format!("{err:#}");
                self.status
                    .update(|status| status.last_error = Some(message))
                    .await;
                None
            }
        }
    }

    /// Runs a cycle now, then at every :00 and :30. Never returns.
    pub async fn run(&self) {
        self.tick(Utc::now()).await;
        tracing::info!("scheduler started");

        loop {
            let wait = until_next_slot(&Utc::now().with_timezone(&self.tz));
            tracing::debug!(wait_secs = wait.as_secs(), "waiting for next cycle");
            tokio::time::sleep(wait).await;
            self.tick(Utc::now()).await;
        }
    }
}
