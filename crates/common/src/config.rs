//! Gateway configuration types.

use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream provider credentials and endpoints.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Per-client admission control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// In-memory reading history.
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenWeatherMap API key. Empty disables the provider.
    #[serde(default)]
    pub openweather_api_key: String,

    /// WeatherAPI.com key. Empty disables the provider.
    #[serde(default)]
    pub weatherapi_key: String,

    #[serde(default = "default_openweather_base_url")]
    pub openweather_base_url: String,

    #[serde(default = "default_weatherapi_base_url")]
    pub weatherapi_base_url: String,

    /// Shared deadline for one fan-out across all providers.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl ProvidersConfig {
    pub fn openweather_enabled(&self) -> bool {
        !self.openweather_api_key.trim().is_empty()
    }

    pub fn weatherapi_enabled(&self) -> bool {
        !self.weatherapi_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admitted requests per identity per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Sliding window length.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Global record bound across all cities.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,

    /// Records returned by a history query.
    #[serde(default = "default_view_limit")]
    pub view_limit: usize,

    /// Prior records considered by trend analysis.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_bind_addr() -> String {
    "0.0.0.0:5000".into()
}
fn default_openweather_base_url() -> String {
    "http://api.openweathermap.org".into()
}
fn default_weatherapi_base_url() -> String {
    "http://api.weatherapi.com".into()
}
fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_requests() -> usize {
    10
}
fn default_window_secs() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    100
}
fn default_view_limit() -> usize {
    10
}
fn default_trend_window() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: String::new(),
            weatherapi_key: String::new(),
            openweather_base_url: default_openweather_base_url(),
            weatherapi_base_url: default_weatherapi_base_url(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            view_limit: default_view_limit(),
            trend_window: default_trend_window(),
        }
    }
}
