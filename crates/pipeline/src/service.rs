//! The three downstream operations, gated by admission control.
//!
//! `WeatherService` owns handles to the process-wide stores and the
//! configured fetchers. Every public operation is admitted through the rate
//! limiter first; a denied request performs no fetch and writes no history.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::config::GatewayConfig;
use common::{Analysis, CanonicalReading, CityKey, Error, HistoryView, Provider};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{aggregate, SharedFetcher};
use crate::history::HistoryStore;
use crate::normalizer::normalize;
use crate::rate_limit::RateLimiter;
use crate::trend::TrendAnalyzer;

/// Tunables that are not owned by a store.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Shared deadline for one fan-out.
    pub fetch_timeout: Duration,
    /// Records returned by a history query.
    pub view_limit: usize,
    /// Prior records considered by trend analysis.
    pub trend_window: usize,
}

impl ServiceSettings {
    pub fn from_config(cfg: &GatewayConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(cfg.providers.fetch_timeout_secs),
            view_limit: cfg.history.view_limit,
            trend_window: cfg.history.trend_window,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            view_limit: 10,
            trend_window: crate::trend::DEFAULT_WINDOW,
        }
    }
}

/// Snapshot for the status endpoint and heartbeat.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub providers: Vec<Provider>,
    pub history_records: usize,
    pub history_capacity: usize,
    pub rate_limited_identities: usize,
}

pub struct WeatherService {
    fetchers: Vec<SharedFetcher>,
    history: Arc<HistoryStore>,
    limiter: Arc<RateLimiter>,
    analyzer: TrendAnalyzer,
    settings: ServiceSettings,
}

impl WeatherService {
    pub fn new(
        fetchers: Vec<SharedFetcher>,
        history: Arc<HistoryStore>,
        limiter: Arc<RateLimiter>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            fetchers,
            history,
            limiter,
            analyzer: TrendAnalyzer::new(settings.trend_window),
            settings,
        }
    }

    pub fn history_store(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn admit(&self, client: &str) -> Result<(), Error> {
        self.limiter.check(client, Instant::now()).inspect_err(|e| {
            warn!("Rejected request from {}: {}", client, e);
        })
    }

    /// Fan out, then normalise. No admission check, no history write.
    async fn fetch_reading(&self, city: &str) -> Result<CanonicalReading, Error> {
        let key = CityKey::new(city);
        let per_source = aggregate(&key, &self.fetchers, self.settings.fetch_timeout).await?;
        Ok(normalize(&key, city, per_source, Utc::now()))
    }

    /// Current cross-source reading for a city.
    pub async fn get_weather(&self, client: &str, city: &str) -> Result<CanonicalReading, Error> {
        self.admit(client)?;
        self.fetch_reading(city).await
    }

    /// The city's most recent stored readings.
    pub async fn get_history(&self, client: &str, city: &str) -> Result<HistoryView, Error> {
        self.admit(client)?;
        let (total_records, records) = self
            .history
            .view(&CityKey::new(city), self.settings.view_limit);

        Ok(HistoryView {
            city: city.to_string(),
            total_records,
            records,
        })
    }

    /// Fetch, record, and compare against the city's recent history.
    pub async fn get_analytics(&self, client: &str, city: &str) -> Result<Analysis, Error> {
        self.admit(client)?;
        let reading = self.fetch_reading(city).await?;
        let current = reading.averages.temperature;

        let outcome = self.history.record_with_prior(
            &reading.key,
            reading.clone(),
            reading.observed_at,
            self.analyzer.window(),
        );
        let analysis = self.analyzer.analyze(current, &outcome.prior);

        info!(
            "Analytics for {}: temp={:?} insight={:?} records={}",
            reading.key, current, analysis.insight, outcome.total_for_key
        );

        Ok(Analysis {
            city: city.to_string(),
            analysis_time: Utc::now(),
            total_requests: outcome.total_for_key,
            reading,
            insight: analysis.insight,
            insight_message: analysis.insight.message().to_string(),
            trend: analysis.trend,
        })
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            providers: self.fetchers.iter().map(|f| f.provider()).collect(),
            history_records: self.history.len(),
            history_capacity: self.history.capacity(),
            rate_limited_identities: self.limiter.tracked_identities(),
        }
    }
}
