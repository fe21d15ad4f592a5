use std::{error::Error as StdError, fmt, time::Duration};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tokio_util::sync::CancellationToken;

use crate::{
    error::ForecastError,
    model::{Forecast, RawForecastRecord, forecasts_from_records},
    retry::{self, Attempt, RetryHook, RetryPolicy},
};

use super::ForecastFetcher;

/// Path of the forecast resource, relative to the configured base URL.
pub const FORECAST_PATH: &str = "WeatherForecast";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches forecasts from `GET {base_url}/WeatherForecast`.
#[derive(Clone)]
pub struct HttpForecastFetcher {
    endpoint: Url,
    http: Client,
    policy: RetryPolicy,
    on_retry: Option<RetryHook>,
}

impl fmt::Debug for HttpForecastFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpForecastFetcher")
            .field("endpoint", &self.endpoint.as_str())
            .field("policy", &self.policy)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl HttpForecastFetcher {
    pub fn new(base_url: &str, policy: RetryPolicy) -> Result<Self> {
        let endpoint = normalize_base_url(base_url)?
            .join(FORECAST_PATH)
            .with_context(|| format!("Failed to build forecast URL from '{base_url}'"))?;

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { endpoint, http, policy, on_retry: None })
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_retry_hook(mut self, hook: RetryHook) -> Self {
        self.on_retry = Some(hook);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn attempt(&self) -> Result<Vec<Forecast>, Attempt> {
        let res = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let cause = format!("upstream returned {status}: {}", truncate_body(&body));
            return Err(if is_retryable_status(status) {
                Attempt::Transient(cause)
            } else {
                Attempt::Fatal(ForecastError::RequestFailed(cause))
            });
        }

        let body = res.text().await.map_err(|e| {
            Attempt::Transient(format!("failed to read response body: {}", error_chain(&e)))
        })?;

        parse_forecast_body(&body).map_err(Attempt::Fatal)
    }
}

#[async_trait]
impl ForecastFetcher for HttpForecastFetcher {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Forecast>, ForecastError> {
        tracing::debug!(url = %self.endpoint, "fetching weather forecasts");

        let hook = self.on_retry.as_deref();
        let forecasts = retry::run_with_retry(
            &self.policy,
            cancel,
            move || self.attempt(),
            |event| {
                if let Some(hook) = hook {
                    hook(event);
                }
            },
        )
        .await?;

        tracing::debug!(count = forecasts.len(), "fetched weather forecasts");
        Ok(forecasts)
    }
}

/// Parses the upstream body; an empty or `null` body means no forecasts.
pub fn parse_forecast_body(body: &str) -> Result<Vec<Forecast>, ForecastError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Option<Vec<RawForecastRecord>> = serde_json::from_str(body)
        .map_err(|e| ForecastError::Unexpected(format!("invalid forecast payload: {e}")))?;

    Ok(records.map(forecasts_from_records).unwrap_or_default())
}

/// Parses `base_url` and makes sure its path ends in `/`, so joining the
/// forecast path appends to it instead of replacing the last segment.
pub fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    let mut url =
        Url::parse(trimmed).with_context(|| format!("Invalid weather API base URL '{trimmed}'"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "Weather API base URL must use http or https, got '{}'",
            url.scheme()
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// 5xx, 408 and 429 are worth another try; everything else is final.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_send_error(err: reqwest::Error) -> Attempt {
    let cause = error_chain(&err);

    if err.is_builder() {
        return Attempt::Fatal(ForecastError::Unexpected(cause));
    }

    if err.is_timeout() || err.is_connect() || err.is_request() {
        return Attempt::Transient(cause);
    }

    Attempt::Fatal(ForecastError::RequestFailed(cause))
}

/// reqwest hides the interesting part (refused, reset, dns) in the source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = normalize_base_url("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/");

        let url = normalize_base_url(" https://example.com/api ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let fetcher =
            HttpForecastFetcher::new("https://example.com/api", RetryPolicy::default()).unwrap();
        assert_eq!(fetcher.endpoint().as_str(), "https://example.com/api/WeatherForecast");

        let fetcher =
            HttpForecastFetcher::new("http://localhost:5000/", RetryPolicy::default()).unwrap();
        assert_eq!(fetcher.endpoint().as_str(), "http://localhost:5000/WeatherForecast");
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        let err = normalize_base_url("not a url").unwrap_err();
        assert!(err.to_string().contains("Invalid weather API base URL"));

        let err = normalize_base_url("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));

        assert!(!is_retryable_status(StatusCode::OK));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn empty_and_null_bodies_yield_no_forecasts() {
        assert_eq!(parse_forecast_body(""), Ok(Vec::new()));
        assert_eq!(parse_forecast_body("  \n"), Ok(Vec::new()));
        assert_eq!(parse_forecast_body("null"), Ok(Vec::new()));
        assert_eq!(parse_forecast_body("[]"), Ok(Vec::new()));
    }

    #[test]
    fn malformed_body_is_unexpected() {
        let err = parse_forecast_body("{\"oops\": true}").unwrap_err();
        assert_eq!(err.kind(), "unexpected");

        let err = parse_forecast_body("<html>").unwrap_err();
        assert!(err.to_string().contains("invalid forecast payload"));
    }

    #[test]
    fn body_filters_records_without_dates() {
        let body = r#"[
            {"date": "2025-05-01", "temperatureC": 100, "summary": "Scorching"},
            {"date": null, "temperatureC": 3, "summary": "Chilly"}
        ]"#;

        let forecasts = parse_forecast_body(body).unwrap();

        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].temperature_f, 212);
        assert_eq!(forecasts[0].summary.as_deref(), Some("Scorching"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_body("short"), "short");
    }
}
