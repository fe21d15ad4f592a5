use std::time::Duration;

/// Classified failure of a forecast fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForecastError {
    /// The whole call, retries included, ran past the configured deadline.
    #[error("weather service timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("weather request was cancelled")]
    Cancelled,

    /// Non-retryable failure, or a transient one that outlived its retries.
    #[error("weather request failed: {0}")]
    RequestFailed(String),

    #[error("unexpected error while fetching weather: {0}")]
    Unexpected(String),
}

impl ForecastError {
    /// Stable identifier for presentation layers.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::Timeout(_) => "timeout",
            ForecastError::Cancelled => "cancelled",
            ForecastError::RequestFailed(_) => "request_failed",
            ForecastError::Unexpected(_) => "unexpected",
        }
    }
}
