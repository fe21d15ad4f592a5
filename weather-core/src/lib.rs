//! Core library for the `weather` service.
//!
//! This crate defines:
//! - Configuration (upstream base URL, timeout and retry settings)
//! - The forecast data model and its validation rules
//! - A classified error type for failed fetches
//! - The `ForecastFetcher` abstraction and its HTTP implementation,
//!   wrapped in timeout, cancellation and exponential backoff
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod retry;

pub use config::{Config, ServerConfig, WeatherApiConfig};
pub use error::ForecastError;
pub use model::{Forecast, RawForecastRecord};
pub use provider::{ForecastFetcher, fetcher_from_config, http::HttpForecastFetcher};
pub use retry::{RetryEvent, RetryHook, RetryPolicy};
pub use tokio_util::sync::CancellationToken;
