use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use mower_core::{
    Config, ControlSettings, Controller, DecisionState, HusqvarnaClient, MowerApi,
    OpenMeteoProvider,
};
use std::{path::PathBuf, sync::Arc};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "mower",
    version,
    about = "Parks or resumes robotic mowers based on the weather"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set credentials, location and mowing hours.
    Configure,

    /// Run the control loop every 30 minutes and serve the status page.
    Run {
        /// Decide and display, but never send commands to the mowers.
        #[arg(long)]
        dry_run: bool,

        /// Address for the status page, e.g. "127.0.0.1:5000".
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run a single control cycle and print the decision.
    Check {
        #[arg(long)]
        dry_run: bool,
    },

    /// List the mowers linked to the configured account.
    Mowers,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&path),
            Command::Run { dry_run, bind } => {
                let config = load_checked(&path)?;
                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                run_daemon(&config, dry_run, &bind).await
            }
            Command::Check { dry_run } => {
                let config = load_checked(&path)?;
                let controller = build_controller(&config, dry_run)?;
                let decision = controller.run_cycle(Utc::now()).await?;
                print_decision(&decision, dry_run);
                Ok(())
            }
            Command::Mowers => {
                let config = load_checked(&path)?;
                let client = husqvarna_client(&config)?;
                for mower in client.list_mowers().await? {
                    println!("{:<40} {}", mower.id, mower.name);
                }
                Ok(())
            }
        }
    }
}

fn load_checked(path: &std::path::Path) -> Result<Config> {
    let mut config = Config::load_from(path)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn husqvarna_client(config: &Config) -> Result<HusqvarnaClient> {
    HusqvarnaClient::new(
        config.husqvarna.application_key.clone(),
        config.husqvarna.application_secret.clone(),
    )
    .context("Failed to create Husqvarna client")
}

fn build_controller(config: &Config, dry_run: bool) -> Result<Controller<Local>> {
    let weather = OpenMeteoProvider::new(config.location.latitude, config.location.longitude)
        .context("Failed to create weather client")?;
    Ok(Controller::new(
        Arc::new(weather),
        Arc::new(husqvarna_client(config)?),
        ControlSettings::from_config(config, dry_run),
        Local,
    ))
}

async fn run_daemon(config: &Config, dry_run: bool, bind: &str) -> Result<()> {
    let controller = Arc::new(build_controller(config, dry_run)?);
    let status = controller.status();

    let scheduler = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.run().await })
    };

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind status page to {bind}"))?;
    tracing::info!(%bind, dry_run, "status page listening");

    axum::serve(listener, server::router(status))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Status page server failed")?;

    scheduler.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}

fn configure(path: &std::path::Path) -> Result<()> {
    let mut config = Config::load_from(path)?;

    let key = Text::new("Husqvarna application key:")
        .with_initial_value(&config.husqvarna.application_key)
        .prompt()?;
    let secret = Password::new("Husqvarna application secret (empty keeps current):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    config.husqvarna.application_key = key.trim().to_string();
    if !secret.is_empty() {
        config.husqvarna.application_secret = secret;
    }

    config.location.latitude = CustomType::<f64>::new("Latitude:")
        .with_default(config.location.latitude)
        .with_error_message("Please type a decimal number")
        .prompt()?;
    config.location.longitude = CustomType::<f64>::new("Longitude:")
        .with_default(config.location.longitude)
        .with_error_message("Please type a decimal number")
        .prompt()?;

    config.schedule.mowing_start_hour = CustomType::<u32>::new("Mowing starts at (local hour):")
        .with_default(config.schedule.mowing_start_hour)
        .prompt()?;
    config.schedule.mowing_end_hour = CustomType::<u32>::new("Mowing ends at (local hour):")
        .with_default(config.schedule.mowing_end_hour)
        .prompt()?;

    config.validate()?;
    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_decision(decision: &DecisionState, dry_run: bool) {
    println!(
        "{:<20} {:<15} {:<35} {:<12} {:<8} {:<8}",
        "Local Time", "Weather Code", "Description", "Intensity", "Weight", "Action"
    );
    println!("{}", "-".repeat(100));
    for entry in &decision.forecast_analysis {
        println!(
            "{:<20} {:<15} {:<35} {:<12} {:<8.2} {:<8}",
            entry.local_time,
            entry.weather_code,
            entry.description,
            entry.intensity,
            entry.weight,
            entry.action.as_str()
        );
    }
    println!();
    println!("Currently raining: {}", decision.currently_raining);
    println!(
        "Good weather:      {} (score {:.2})",
        decision.good_weather, decision.weather_score
    );
    println!(
        "Action:            {} -> {}{}",
        decision.current_action,
        decision.current_action.command(),
        if dry_run { " (dry run, not sent)" } else { "" }
    );
}
