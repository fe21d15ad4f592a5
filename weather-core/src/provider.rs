use crate::{Config, error::ForecastError, model::Forecast, provider::http::HttpForecastFetcher};
use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

pub mod http;

/// Source of forecasts, handed to callers as `Box<dyn ForecastFetcher>` or
/// `Arc<dyn ForecastFetcher>`.
#[async_trait]
pub trait ForecastFetcher: Send + Sync + Debug {
    /// Fetch the current forecast list. Firing `cancel` aborts the in-flight
    /// call and any pending retry.
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Forecast>, ForecastError>;
}

/// Construct the HTTP fetcher from the `[weather_api]` section of the config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastFetcher>> {
    let base_url = config.base_url()?;
    let fetcher = HttpForecastFetcher::new(base_url, config.weather_api.retry_policy())?;

    tracing::debug!(?fetcher, "configured forecast fetcher");
    Ok(Box::new(fetcher))
}
