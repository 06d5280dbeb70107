//! The seam between the pipeline and individual weather providers.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{CityKey, Provider, SourceReading};

/// An isolated call to one upstream provider.
///
/// `fetch` is total: network errors, non-200 statuses, timeouts and malformed
/// payloads all come back as [`SourceReading::unavailable`]. Implementations
/// log the cause themselves; the caller only ever sees availability.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Which provider this fetcher talks to.
    fn provider(&self) -> Provider;

    /// Fetch the current conditions for `city`, giving up after `timeout`.
    async fn fetch(&self, city: &CityKey, timeout: Duration) -> SourceReading;
}
