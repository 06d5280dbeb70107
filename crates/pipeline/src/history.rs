//! Bounded in-memory reading history.
//!
//! One global FIFO across every city. The bound is global, so a burst of
//! traffic for one city can evict another city's oldest records. Per-city
//! views are derived at query time by filtering on the normalised key.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use common::{CanonicalReading, CityKey, HistoryRecord};
use parking_lot::RwLock;

pub const DEFAULT_CAPACITY: usize = 100;

/// Result of an atomic record-and-read.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The key's most recent records from before this insert, most recent last.
    pub prior: Vec<HistoryRecord>,
    /// Records held for the key after this insert and any eviction.
    pub total_for_key: usize,
}

/// Process-lifetime history store. Writers are serialised by the lock;
/// readers get a cloned snapshot and never see a half-evicted sequence.
#[derive(Debug)]
pub struct HistoryStore {
    records: RwLock<VecDeque<HistoryRecord>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity.saturating_add(1))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn tail_for(records: &VecDeque<HistoryRecord>, key: &CityKey, limit: usize) -> Vec<HistoryRecord> {
        let mut tail: Vec<HistoryRecord> = records
            .iter()
            .rev()
            .filter(|r| &r.key == key)
            .take(limit)
            .cloned()
            .collect();
        tail.reverse();
        tail
    }

    fn push_and_evict(&self, records: &mut VecDeque<HistoryRecord>, record: HistoryRecord) {
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Append a reading, evicting the globally oldest records past capacity.
    pub fn record(&self, key: &CityKey, reading: CanonicalReading, now: DateTime<Utc>) {
        let mut records = self.records.write();
        self.push_and_evict(
            &mut records,
            HistoryRecord {
                key: key.clone(),
                timestamp: now,
                reading,
            },
        );
    }

    /// Capture the key's last `prior_limit` records, then append, under one
    /// write lock. Concurrent analyses of the same city each see a consistent
    /// "before" view.
    pub fn record_with_prior(
        &self,
        key: &CityKey,
        reading: CanonicalReading,
        now: DateTime<Utc>,
        prior_limit: usize,
    ) -> RecordOutcome {
        let mut records = self.records.write();
        let prior = Self::tail_for(&records, key, prior_limit);
        self.push_and_evict(
            &mut records,
            HistoryRecord {
                key: key.clone(),
                timestamp: now,
                reading,
            },
        );
        let total_for_key = records.iter().filter(|r| &r.key == key).count();

        RecordOutcome {
            prior,
            total_for_key,
        }
    }

    /// At most `limit` records for `key`, most recent last.
    pub fn recent(&self, key: &CityKey, limit: usize) -> Vec<HistoryRecord> {
        Self::tail_for(&self.records.read(), key, limit)
    }

    /// Total count and tail for `key`, read from one snapshot so the two
    /// always agree.
    pub fn view(&self, key: &CityKey, limit: usize) -> (usize, Vec<HistoryRecord>) {
        let records = self.records.read();
        let total = records.iter().filter(|r| &r.key == key).count();
        (total, Self::tail_for(&records, key, limit))
    }

    /// Records currently held for `key`.
    pub fn count(&self, key: &CityKey) -> usize {
        self.records.read().iter().filter(|r| &r.key == key).count()
    }

    /// Records held across all keys.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use common::Averages;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub(crate) fn canonical(city: &str, temperature: Option<f64>, at: DateTime<Utc>) -> CanonicalReading {
        CanonicalReading {
            key: CityKey::new(city),
            city: city.to_string(),
            observed_at: at,
            per_source: BTreeMap::new(),
            averages: Averages {
                temperature,
                humidity: None,
            },
            data_sources: BTreeMap::new(),
        }
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid time")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_recent_filters_case_insensitively() {
        let store = HistoryStore::new();
        let t0 = base_time();
        store.record(&CityKey::new("Paris"), canonical("Paris", Some(18.0), t0), t0);
        store.record(&CityKey::new("berlin"), canonical("berlin", Some(9.0), t0), t0);
        store.record(&CityKey::new("PARIS"), canonical("PARIS", Some(19.0), t0), t0);

        let paris = store.recent(&CityKey::new("paris"), 10);

        assert_eq!(paris.len(), 2);
        assert_eq!(paris[0].reading.averages.temperature, Some(18.0));
        assert_eq!(paris[1].reading.averages.temperature, Some(19.0));
    }

    #[test]
    fn test_recent_takes_tail_most_recent_last() {
        let store = HistoryStore::new();
        let key = CityKey::new("Oslo");
        let t0 = base_time();
        for i in 0..15 {
            let at = t0 + Duration::minutes(i);
            store.record(&key, canonical("Oslo", Some(i as f64), at), at);
        }

        let tail = store.recent(&key, 10);

        assert_eq!(tail.len(), 10);
        assert_eq!(tail.first().unwrap().reading.averages.temperature, Some(5.0));
        assert_eq!(tail.last().unwrap().reading.averages.temperature, Some(14.0));
        assert!(tail.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_global_capacity_evicts_oldest_across_keys() {
        let store = HistoryStore::new();
        let t0 = base_time();
        let paris = CityKey::new("Paris");
        let rome = CityKey::new("Rome");

        for i in 0..101 {
            let at = t0 + Duration::seconds(i);
            let key = if i % 2 == 0 { &paris } else { &rome };
            store.record(key, canonical(key.as_str(), Some(20.0), at), at);
        }

        assert_eq!(store.len(), 100);
        let oldest_paris = store.recent(&paris, 100);
        assert!(oldest_paris.iter().all(|r| r.timestamp != t0));
        assert_eq!(oldest_paris.len(), 50);
        assert_eq!(store.count(&rome), 50);
    }

    #[test]
    fn test_burst_for_one_city_evicts_another() {
        let store = HistoryStore::with_capacity(3);
        let t0 = base_time();
        let a = CityKey::new("a");
        let b = CityKey::new("b");

        store.record(&a, canonical("a", Some(1.0), t0), t0);
        for i in 1..=3 {
            let at = t0 + Duration::seconds(i);
            store.record(&b, canonical("b", Some(2.0), at), at);
        }

        assert_eq!(store.count(&a), 0);
        assert_eq!(store.count(&b), 3);
    }

    #[test]
    fn test_record_with_prior_excludes_new_record() {
        let store = HistoryStore::new();
        let key = CityKey::new("Lima");
        let t0 = base_time();
        store.record(&key, canonical("Lima", Some(18.0), t0), t0);
        store.record(&key, canonical("Lima", Some(20.0), t0), t0);

        let at = t0 + Duration::minutes(1);
        let outcome = store.record_with_prior(&key, canonical("Lima", Some(23.0), at), at, 5);

        assert_eq!(outcome.prior.len(), 2);
        assert_eq!(outcome.total_for_key, 3);
        assert_eq!(store.recent(&key, 1)[0].reading.averages.temperature, Some(23.0));
    }

    #[test]
    fn test_view_counts_and_tail_together() {
        let store = HistoryStore::new();
        let key = CityKey::new("Kyiv");
        let t0 = base_time();
        for i in 0..12 {
            let at = t0 + Duration::seconds(i);
            store.record(&key, canonical("Kyiv", Some(i as f64), at), at);
        }

        let (total, records) = store.view(&key, 10);

        assert_eq!(total, 12);
        assert_eq!(records.len(), 10);
        assert_eq!(records[9].reading.averages.temperature, Some(11.0));
    }

    #[test]
    fn test_concurrent_writes_never_tear_reads() {
        let store = Arc::new(HistoryStore::with_capacity(20));
        let key = CityKey::new("Paris");
        let t0 = base_time();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                let key = key.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let at = t0 + Duration::milliseconds(w * 1_000 + i);
                        store.record(&key, canonical("Paris", Some(i as f64), at), at);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let (total, records) = store.view(&key, 10);
                        assert!(total <= 20);
                        assert!(records.len() <= total.min(10));
                        assert!(store.len() <= 20);
                        assert!(records.iter().all(|r| r.key == key));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 20);
        assert_eq!(store.recent(&key, 100).len(), 20);
    }

    #[test]
    fn test_empty_store() {
        let store = HistoryStore::default();
        assert!(store.is_empty());
        assert!(store.recent(&CityKey::new("nowhere"), 10).is_empty());
        assert_eq!(store.capacity(), 100);
    }
}
