//! Aggregation and analytics pipeline.
//!
//! Admission control, provider fan-out, normalisation, bounded history and
//! trend analysis, plus the `WeatherService` that strings them together.

pub mod aggregator;
pub mod history;
pub mod normalizer;
pub mod rate_limit;
pub mod service;
pub mod trend;

pub use aggregator::{aggregate, SharedFetcher};
pub use history::{HistoryStore, RecordOutcome};
pub use normalizer::{compute_averages, normalize};
pub use rate_limit::RateLimiter;
pub use service::{ServiceSettings, ServiceStatus, WeatherService};
pub use trend::TrendAnalyzer;
