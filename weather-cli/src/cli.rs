use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::debug;
use weather_core::{Config, FetchController, FetchState, Screen, provider_from_config};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and the default city.
    Configure,

    /// Show current weather for a city and exit.
    Show {
        /// City name; defaults to the configured city (or Moscow).
        city: Option<String>,
    },

    /// Interactive lookup: prompt for cities until Esc or Ctrl-C.
    Search,
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        match self.command {
            Command::Configure => {
                configure()?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Show { city } => show(city).await,
            Command::Search => {
                search().await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;
    let current_city = config.default_city().to_owned();

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let default_city = Text::new("Default city:")
        .with_initial_value(&current_city)
        .prompt()
        .context("Failed to read default city")?;

    config.set_api_key(api_key.trim().to_owned());
    config.default_city = Some(default_city.trim().to_owned()).filter(|city| !city.is_empty());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn controller_from_config(config: &Config) -> Result<FetchController> {
    let provider = provider_from_config(config)?;
    let initial = FetchState::with_city(config.default_city());

    Ok(FetchController::with_state(provider, initial).with_ordering(config.response_ordering()))
}

async fn show(city: Option<String>) -> Result<ExitCode> {
    let config = Config::load()?;
    let controller = controller_from_config(&config)?;

    if let Some(city) = city {
        controller.set_city_input(city);
    }

    let outcome = controller.fetch_weather().await;
    println!("{}", render::screen(&Screen::from_state(&controller.state(), &Local)));

    Ok(if outcome.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn search() -> Result<()> {
    let config = Config::load()?;
    let controller = controller_from_config(&config)?;
    let mut updates = controller.subscribe();

    // The screen opens with a lookup of the default city.
    fetch_and_render(&controller, &mut updates).await?;

    loop {
        let current = controller.state().city_input;
        let input = tokio::task::spawn_blocking(move || {
            Text::new("City:").with_initial_value(&current).prompt()
        })
        .await
        .context("City prompt task failed")?;

        let city = match input {
            Ok(city) => city,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read city name"),
        };

        controller.set_city_input(city);
        fetch_and_render(&controller, &mut updates).await?;
    }

    Ok(())
}

/// Start a fetch in the background and render every published snapshot until
/// loading is over. Returns the last snapshot rendered.
async fn fetch_and_render(
    controller: &FetchController,
    updates: &mut watch::Receiver<FetchState>,
) -> Result<FetchState> {
    let _ = updates.borrow_and_update();

    let task = tokio::spawn({
        let controller = controller.clone();
        async move { controller.fetch_weather().await }
    });

    let last = loop {
        updates.changed().await.context("Weather state channel closed")?;
        let snapshot = updates.borrow_and_update().clone();

        println!("{}", render::screen(&Screen::from_state(&snapshot, &Local)));
        if !snapshot.is_loading {
            break snapshot;
        }
    };

    let outcome = task.await.context("Weather lookup task failed")?;
    debug!(ok = outcome.is_ok(), "lookup finished");
    Ok(last)
}
