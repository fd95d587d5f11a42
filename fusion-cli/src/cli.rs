use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_fusion_core::{
    Config, ForecastRequest, ForecastResponse, ForecastService, ProviderId, sources_from_config,
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-fusion", version, about = "Fused multi-provider temperature forecasts")]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "weatherapi".
        provider: String,
    },

    /// Show the fused 7-day forecast for a coordinate pair.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Print the raw JSON response instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show which providers are usable and where the config lives.
    Status,

    /// Run the HTTP server exposing `POST /api/weather`.
    Serve {
        /// Overrides `PORT` and the config file.
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Forecast { lat, lon, json } => forecast(lat, lon, json).await,
            Command::Status => status(),
            Command::Serve { port } => {
                let config = Config::load()?;
                let port = port.unwrap_or_else(|| config.server_port());
                server::serve(&config, port).await
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;

    if !id.requires_api_key() {
        println!("{} does not need an API key.", id.display_name());
        return Ok(());
    }

    let api_key = Password::new(&format!("{} API key:", id.display_name()))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let mut config = Config::load()?;
    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!("Saved {} key to {}", id.display_name(), Config::config_file_path()?.display());
    Ok(())
}

async fn forecast(lat: f64, lon: f64, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let service = ForecastService::from_sources(sources_from_config(&config)?);

    match service.forecast(&ForecastRequest::new(lat, lon)).await {
        Ok(resp) if json => {
            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(())
        }
        Ok(resp) => {
            print!("{}", render_table(&resp));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.body())?);
            Err(e.into())
        }
    }
}

fn status() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Config file: {}", Config::config_file_path()?.display());
    for id in ProviderId::all() {
        println!("- {}: {}", id.display_name(), config.key_status(*id));
    }
    Ok(())
}

fn render_table(resp: &ForecastResponse) -> String {
    let mut out = format!(
        "Forecast for {:.4}, {:.4}\n\n",
        resp.location.latitude, resp.location.longitude
    );

    for day in &resp.forecast {
        out.push_str(&format!(
            "{:<4} {}  {:>6.1}°C  ({} samples)\n",
            day.day_name, day.date, day.temperature, day.data_points
        ));
    }

    out.push('\n');
    for (name, ok) in &resp.sources {
        out.push_str(&format!("{name}: {}\n", if *ok { "ok" } else { "failed" }));
    }
    out
}
