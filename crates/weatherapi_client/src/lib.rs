//! WeatherAPI.com client.
//!
//! Reads `v1/current.json` and maps the `current` block onto `SourceReading`.

use std::time::Duration;

use async_trait::async_trait;
use common::{CityKey, Error, Measurements, Provider, SourceFetcher, SourceReading};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";
const CURRENT_PATH: &str = "/v1/current.json";

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Response from `v1/current.json`. The `current` block is mandatory.
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub current: Current,
}

#[derive(Debug, Deserialize)]
pub struct Current {
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure_mb: Option<f64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub wind_kph: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub text: Option<String>,
}

impl WeatherApiClient {
    pub fn new(api_key: String) -> Result<Self, Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("weather-gateway/0.1")
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| Error::Http(format!("failed to build WeatherAPI HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions for a city.
    pub async fn fetch_current(&self, city: &str, timeout: Duration) -> Result<Current, Error> {
        let url = format!("{}{}", self.base_url, CURRENT_PATH);
        debug!("Fetching WeatherAPI current conditions: {} q={}", url, city);

        let resp = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::WeatherApi(format!("HTTP error for {city}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::WeatherApi(format!(
                "WeatherAPI returned {} for {}: {}",
                status,
                city,
                body.chars().take(500).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::WeatherApi(format!("failed to read body for {city}: {e}")))?;
        let payload: CurrentResponse = serde_json::from_str(&body)?;

        Ok(payload.current)
    }
}

fn to_measurements(current: Current) -> Measurements {
    Measurements {
        temperature: current.temp_c,
        humidity: current.humidity,
        pressure: current.pressure_mb,
        description: current.condition.and_then(|c| c.text),
        wind_speed: current.wind_kph,
    }
}

#[async_trait]
impl SourceFetcher for WeatherApiClient {
    fn provider(&self) -> Provider {
        Provider::WeatherApi
    }

    async fn fetch(&self, city: &CityKey, timeout: Duration) -> SourceReading {
        match self.fetch_current(city.as_str(), timeout).await {
            Ok(current) => SourceReading::available(Provider::WeatherApi, to_measurements(current)),
            Err(e) => {
                let absorbed = Error::ProviderUnavailable {
                    provider: Provider::WeatherApi,
                    reason: e.to_string(),
                };
                warn!("{}", absorbed);
                SourceReading::unavailable(Provider::WeatherApi)
            }
        }
    }
}
