//! HTTP front-end: `GET /api/weather`.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use weather_core::{ForecastError, ForecastFetcher};

#[derive(Debug, Clone)]
struct AppState {
    fetcher: Arc<dyn ForecastFetcher>,
    shutdown: CancellationToken,
}

/// Error state rendered instead of a forecast list.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub fn router(fetcher: Arc<dyn ForecastFetcher>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/api/weather", get(get_weather))
        .with_state(AppState { fetcher, shutdown })
}

/// Serve until `shutdown` fires; in-flight fetches see the same cancellation.
pub async fn serve(
    bind: &str,
    fetcher: Arc<dyn ForecastFetcher>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener =
        TcpListener::bind(bind).await.with_context(|| format!("Failed to bind to {bind}"))?;
    let addr = listener.local_addr().context("Failed to read local address")?;
    tracing::info!(%addr, "serving GET /api/weather");

    let app = router(fetcher, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn get_weather(State(state): State<AppState>) -> Response {
    let cancel = state.shutdown.child_token();

    match state.fetcher.fetch(&cancel).await {
        Ok(forecasts) => Json(forecasts).into_response(),
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "forecast fetch failed");
            let body = ErrorBody { error: err.kind(), message: err.to_string() };
            (status_for(&err), Json(body)).into_response()
        }
    }
}

fn status_for(err: &ForecastError) -> StatusCode {
    match err {
        ForecastError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ForecastError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ForecastError::RequestFailed(_) => StatusCode::BAD_GATEWAY,
        ForecastError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
