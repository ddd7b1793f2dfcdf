//! Core library for the `mower` daemon.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather and mower vendor API clients
//! - The weather scoring heuristic and the control loop
//!
//! It is used by `mower-cli`, but can also be reused by other binaries or services.

pub mod codes;
pub mod config;
pub mod control;
pub mod error;
pub mod http;
pub mod model;
pub mod mower;
pub mod provider;
pub mod scoring;
pub mod status;

pub use config::Config;
pub use control::{ControlSettings, Controller};
pub use error::ApiError;
pub use model::{Action, DecisionState, ForecastEntry, MowerRef, WeatherSample};
pub use mower::{HusqvarnaClient, MowerApi};
pub use provider::{OpenMeteoProvider, WeatherProvider};
pub use status::{SharedStatus, Status};
