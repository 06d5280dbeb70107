//! Concurrent fan-out across all configured providers.
//!
//! Each fetcher runs in its own task under the shared deadline. A fetcher that
//! misses the deadline is cancelled and reported unavailable; its late result
//! never reaches the caller. The call fails only when no provider is
//! available.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{CityKey, Error, Provider, SourceFetcher, SourceReading};
use futures::future::join_all;
use tracing::{debug, warn};

/// A fetcher shared between the service and its spawned fetch tasks.
pub type SharedFetcher = Arc<dyn SourceFetcher>;

/// Fetch `city` from every provider concurrently.
///
/// Returns the full per-provider map, unavailable entries included, as long
/// as at least one provider answered.
pub async fn aggregate(
    city: &CityKey,
    fetchers: &[SharedFetcher],
    timeout: Duration,
) -> Result<BTreeMap<Provider, SourceReading>, Error> {
    let tasks = fetchers.iter().map(|fetcher| {
        let fetcher = Arc::clone(fetcher);
        let provider = fetcher.provider();
        let city = city.clone();

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, fetcher.fetch(&city, timeout)).await {
                Ok(reading) => reading,
                Err(_) => {
                    warn!("{}: no answer for {} within {:?}", provider, city, timeout);
                    SourceReading::unavailable(provider)
                }
            }
        });

        async move {
            let reading = match handle.await {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("{}: fetch task failed: {}", provider, e);
                    SourceReading::unavailable(provider)
                }
            };
            (provider, reading)
        }
    });

    let readings: BTreeMap<Provider, SourceReading> = join_all(tasks).await.into_iter().collect();

    let available = readings.values().filter(|r| r.is_available()).count();
    debug!(
        "Aggregated {}: {}/{} providers available",
        city,
        available,
        readings.len()
    );

    if available == 0 {
        warn!("All {} weather sources failed for {}", readings.len(), city);
        return Err(Error::AllSourcesFailed {
            city: city.to_string(),
        });
    }

    Ok(readings)
}
