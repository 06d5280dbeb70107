//! Reconcile per-provider readings into one canonical record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{Averages, CanonicalReading, CityKey, Provider, SourceReading};

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round2(values.iter().sum::<f64>() / values.len() as f64))
}

/// Cross-source means. Each field is averaged over the available sources
/// that reported it, independently of the other field.
pub fn compute_averages<'a>(readings: impl IntoIterator<Item = &'a SourceReading>) -> Averages {
    let mut temps: Vec<f64> = Vec::new();
    let mut humidities: Vec<f64> = Vec::new();

    for reading in readings.into_iter().filter(|r| r.is_available()) {
        if let Some(t) = reading.temperature() {
            temps.push(t);
        }
        if let Some(h) = reading.humidity() {
            humidities.push(h);
        }
    }

    Averages {
        temperature: mean(&temps),
        humidity: mean(&humidities),
    }
}

/// Build the canonical reading for `key`. Pure; never fails.
pub fn normalize(
    key: &CityKey,
    city: &str,
    per_source: BTreeMap<Provider, SourceReading>,
    now: DateTime<Utc>,
) -> CanonicalReading {
    let averages = compute_averages(per_source.values());
    let data_sources = per_source
        .iter()
        .map(|(provider, reading)| (*provider, reading.status()))
        .collect();

    CanonicalReading {
        key: key.clone(),
        city: city.to_string(),
        observed_at: now,
        per_source,
        averages,
        data_sources,
    }
}
