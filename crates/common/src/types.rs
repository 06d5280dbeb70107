//! Domain types shared across the gateway.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identity ──────────────────────────────────────────────────────────

/// Case-insensitive city identity.
///
/// Normalised once at the boundary (trimmed, lower-cased) so storage and
/// lookup always compare the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CityKey(String);

impl CityKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CityKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ── Providers ─────────────────────────────────────────────────────────

/// An upstream weather data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openweather")]
    OpenWeather,
    #[serde(rename = "weatherapi")]
    WeatherApi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::OpenWeather, Provider::WeatherApi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenWeather => "openweather",
            Provider::WeatherApi => "weatherapi",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source fetch outcome as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Success,
    Failed,
}

// ── Source readings ───────────────────────────────────────────────────

/// Raw measurements reported by one provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Millibar / hPa.
    pub pressure: Option<f64>,
    pub description: Option<String>,
    /// Provider-native unit (m/s or km/h); never averaged.
    pub wind_speed: Option<f64>,
}

/// One provider's answer for one request.
///
/// An unavailable reading carries no measurements at all, so there is nothing
/// for a consumer to read by mistake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReading {
    provider: Provider,
    available: bool,
    #[serde(flatten)]
    measurements: Option<Measurements>,
}

impl SourceReading {
    pub fn available(provider: Provider, measurements: Measurements) -> Self {
        Self {
            provider,
            available: true,
            measurements: Some(measurements),
        }
    }

    pub fn unavailable(provider: Provider) -> Self {
        Self {
            provider,
            available: false,
            measurements: None,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn measurements(&self) -> Option<&Measurements> {
        self.measurements.as_ref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.measurements.as_ref()?.temperature
    }

    pub fn humidity(&self) -> Option<f64> {
        self.measurements.as_ref()?.humidity
    }

    pub fn status(&self) -> SourceStatus {
        if self.available {
            SourceStatus::Success
        } else {
            SourceStatus::Failed
        }
    }
}

// ── Canonical reading ─────────────────────────────────────────────────

/// Cross-source means, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Averages {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// The source-reconciled record for one city at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalReading {
    pub key: CityKey,
    /// The city as the caller spelled it.
    pub city: String,
    pub observed_at: DateTime<Utc>,
    pub per_source: BTreeMap<Provider, SourceReading>,
    pub averages: Averages,
    pub data_sources: BTreeMap<Provider, SourceStatus>,
}

// ── History ───────────────────────────────────────────────────────────

/// A stored reading. Immutable once inserted into the history store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub key: CityKey,
    pub timestamp: DateTime<Utc>,
    pub reading: CanonicalReading,
}

/// Response body for a history query.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub city: String,
    /// Every record currently held for the city.
    pub total_records: usize,
    /// The most recent records, most recent last.
    pub records: Vec<HistoryRecord>,
}

// ── Trend analysis ────────────────────────────────────────────────────

/// How the current temperature compares with the recent average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    Above,
    Below,
    Normal,
    /// Not enough history, or no current temperature.
    None,
}

impl Insight {
    pub fn message(&self) -> &'static str {
        match self {
            Insight::Above => "temperature is above the recent average",
            Insight::Below => "temperature is below the recent average",
            Insight::Normal => "temperature is within the normal range",
            Insight::None => "not enough history to compare",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSnapshot {
    pub current: f64,
    /// Two decimals.
    pub recent_average: f64,
    pub data_points: usize,
}

/// Output of the trend analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub insight: Insight,
    pub trend: Option<TrendSnapshot>,
}

impl TrendAnalysis {
    pub fn none() -> Self {
        Self {
            insight: Insight::None,
            trend: None,
        }
    }
}

/// Response body for an analytics query.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub city: String,
    pub analysis_time: DateTime<Utc>,
    /// Records held for the city, including the one just written.
    pub total_requests: usize,
    pub reading: CanonicalReading,
    pub insight: Insight,
    pub insight_message: String,
    pub trend: Option<TrendSnapshot>,
}
