//! Per-client sliding-window admission control.
//!
//! Every identity keeps the timestamps of its admitted requests that still
//! fall inside the trailing window. Pruning, the capacity check and the append
//! all run while holding the identity's `DashMap` shard lock, so concurrent
//! requests from one client cannot both slip into the last free slot.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use common::Error;
use dashmap::DashMap;
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter keyed by client identity.
///
/// Created once at startup and shared by handle for the life of the process.
/// Nothing is persisted.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// 10 requests per 60 seconds.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }

    pub fn with_limits(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Drop timestamps strictly older than `now - window`. The deque is
    /// time-ordered, so this is a prefix trim.
    fn prune_window(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while history
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) > window)
        {
            history.pop_front();
        }
    }

    /// Admit or deny one request. On admission `now` is recorded against the
    /// identity; a denial leaves the window untouched.
    pub fn admit(&self, identity: &str, now: Instant) -> bool {
        self.check(identity, now).is_ok()
    }

    /// Like [`admit`](Self::admit), but a denial carries the time until the
    /// oldest admitted request leaves the window.
    pub fn check(&self, identity: &str, now: Instant) -> Result<(), Error> {
        let mut history = self.windows.entry(identity.to_string()).or_default();
        Self::prune_window(&mut history, now, self.window);

        if history.len() >= self.max_requests {
            let retry_after = history
                .front()
                .and_then(|oldest| oldest.checked_add(self.window))
                .map_or(self.window, |end| end.saturating_duration_since(now));
            debug!(
                "{}: {} requests in window, denying (retry in {:?})",
                identity,
                history.len(),
                retry_after
            );
            return Err(Error::RateLimited {
                retry_after_ms: u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
            });
        }

        history.push_back(now);
        Ok(())
    }

    /// Remove identities whose windows have fully drained. Returns how many
    /// were dropped.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, history| {
            Self::prune_window(history, now, self.window);
            !history.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
