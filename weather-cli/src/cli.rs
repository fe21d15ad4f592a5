use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use weather_core::{
    Config, Forecast, ForecastFetcher, fetcher_from_config, provider::http::normalize_base_url,
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather forecast service")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the upstream weather API address and retry settings.
    Configure {
        /// Base URL of the upstream API; prompted for when omitted and none is saved.
        #[arg(long)]
        base_url: Option<String>,

        /// Deadline for a whole fetch, retries included.
        #[arg(long)]
        timeout_secs: Option<u64>,

        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Fetch forecasts once and print them.
    Forecast,

    /// Serve `GET /api/weather`.
    Serve {
        /// Address to listen on, e.g. "127.0.0.1:8080".
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { base_url, timeout_secs, max_retries } => {
                let mut cfg = load_config(self.config.as_ref())?;

                match base_url {
                    Some(url) => {
                        normalize_base_url(&url)?;
                        cfg.set_base_url(url);
                    }
                    // Only ask when there is nothing to keep.
                    None if cfg.base_url().is_err() => {
                        let url = prompt_base_url()?;
                        normalize_base_url(&url)?;
                        cfg.set_base_url(url);
                    }
                    None => {}
                }

                if let Some(secs) = timeout_secs {
                    cfg.weather_api.timeout_secs = secs;
                }
                if let Some(retries) = max_retries {
                    cfg.weather_api.max_retries = retries;
                }

                let path = match &self.config {
                    Some(path) => {
                        cfg.save_to(path)?;
                        path.clone()
                    }
                    None => cfg.save()?,
                };
                println!("Saved configuration to {}", path.display());
            }
            Command::Forecast => {
                let cfg = load_config(self.config.as_ref())?.with_env_overrides();
                let fetcher = fetcher_from_config(&cfg)?;

                let forecasts = fetcher.fetch(&shutdown).await?;
                print!("{}", render_table(&forecasts));
            }
            Command::Serve { bind } => {
                let cfg = load_config(self.config.as_ref())?.with_env_overrides();
                let fetcher: Arc<dyn ForecastFetcher> = fetcher_from_config(&cfg)?.into();
                let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());

                server::serve(&bind, fetcher, shutdown).await?;
            }
        }

        Ok(())
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn prompt_base_url() -> anyhow::Result<String> {
    inquire::Text::new("Weather API base URL:")
        .with_help_message("e.g. http://localhost:5000/")
        .prompt()
        .context("Failed to read base URL")
}

/// Plain-text table of forecasts, one line per day.
pub fn render_table(forecasts: &[Forecast]) -> String {
    if forecasts.is_empty() {
        return "No forecasts available.\n".to_string();
    }

    let mut out = format!("{:<10}  {:>6}  {:>6}  {}\n", "Date", "Temp C", "Temp F", "Summary");
    for f in forecasts {
        let date = f.date.to_string();
        out.push_str(&format!(
            "{date:<10}  {:>6}  {:>6}  {}\n",
            f.temperature_c,
            f.temperature_f,
            f.summary.as_deref().unwrap_or("-"),
        ));
    }
    out
}
