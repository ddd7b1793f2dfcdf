use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{CurrentWeather, DecisionState, WeatherSample};

/// Snapshot of the last control cycle, as shown on the status page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {
    pub mower_names: Vec<String>,
    pub current_weather: Option<CurrentWeather>,
    pub past_weather: Vec<WeatherSample>,
    pub decision: Option<DecisionState>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub dry_run: bool,
}

/// Read-only handle to the status written by the controller.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<RwLock<Status>>);

impl SharedStatus {
    pub async fn snapshot(&self) -> Status {
        self.0.read().await.clone()
    }

    pub(crate) async fn update(&self, f: impl FnOnce(&mut Status)) {
        let mut status = self.0.write().await;
        f(&mut status);
    }
}
