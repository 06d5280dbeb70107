//! Unified error type for the weather gateway.

use thiserror::Error;

use crate::types::Provider;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("OpenWeatherMap API error: {0}")]
    OpenWeather(String),

    #[error("WeatherAPI error: {0}")]
    WeatherApi(String),

    /// Absorbed by the fetcher that produced it; never leaves a provider crate.
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: Provider, reason: String },

    #[error("All weather sources failed for {city}")]
    AllSourcesFailed { city: String },

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
