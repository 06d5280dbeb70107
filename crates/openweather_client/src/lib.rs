//! OpenWeatherMap client.
//!
//! Fetches current conditions from the `data/2.5/weather` endpoint in metric
//! units and converts them to the shared `SourceReading` format.

use std::time::Duration;

use async_trait::async_trait;
use common::{CityKey, Error, Measurements, Provider, SourceFetcher, SourceReading};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// OpenWeatherMap API client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Response from `data/2.5/weather`. Only `main` is mandatory.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Option<Vec<ConditionEntry>>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionEntry {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: Option<f64>,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Result<Self, Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host (mock servers, proxies).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("weather-gateway/0.1")
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| Error::Http(format!("failed to build OpenWeatherMap HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions for a city.
    pub async fn fetch_current(
        &self,
        city: &str,
        timeout: Duration,
    ) -> Result<CurrentWeatherResponse, Error> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);
        debug!("Fetching OpenWeatherMap current weather: {} q={}", url, city);

        let resp = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::OpenWeather(format!("HTTP error for {city}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::OpenWeather(format!(
                "OpenWeatherMap returned {} for {}: {}",
                status,
                city,
                body.chars().take(500).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::OpenWeather(format!("failed to read body for {city}: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn to_measurements(resp: CurrentWeatherResponse) -> Measurements {
    Measurements {
        temperature: resp.main.temp,
        humidity: resp.main.humidity,
        pressure: resp.main.pressure,
        description: resp
            .weather
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|entry| entry.description),
        wind_speed: resp.wind.and_then(|w| w.speed),
    }
}

#[async_trait]
impl SourceFetcher for OpenWeatherClient {
    fn provider(&self) -> Provider {
        Provider::OpenWeather
    }

    async fn fetch(&self, city: &CityKey, timeout: Duration) -> SourceReading {
        match self.fetch_current(city.as_str(), timeout).await {
            Ok(resp) => SourceReading::available(Provider::OpenWeather, to_measurements(resp)),
            Err(e) => {
                let absorbed = Error::ProviderUnavailable {
                    provider: Provider::OpenWeather,
                    reason: e.to_string(),
                };
                warn!("{}", absorbed);
                SourceReading::unavailable(Provider::OpenWeather)
            }
        }
    }
}
