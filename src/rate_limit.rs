//! Fixed-window request counter keyed by client identifier.
//!
//! Each key gets a hard counter and a window end. The first request after the
//! window ends replaces the entry with a fresh window, so a client can land up
//! to `2 * max_requests` requests around a window boundary. That is inherent
//! to fixed windows and is kept as is.
//!
//! Entries are never evicted by the limiter itself. [`sweeper`] is the opt-in
//! background task that drops expired windows.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::metrics::RATE_LIMIT_ENTRIES;

// Rate limit entry - tracks requests per client key in the current window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: u64, // ms timestamp where the window ends
}

impl RateLimitEntry {
    fn fresh(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_reset_at: now_ms.saturating_add(window_ms),
        }
    }
}

/// Per-endpoint limit: `max_requests` per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis() as u64,
        }
    }
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request admitted.
    Allowed {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Requests still available in the current window
        remaining: u32,
    },
    /// Request rejected; the counter was not incremented.
    Limited {
        /// Maximum number of requests allowed in the window
        limit: u32,
        /// Time until the current window ends
        reset_after_ms: u64,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { limit, .. } | RateLimitResult::Limited { limit, .. } => *limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    /// Whole seconds a rejected client should wait, at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitResult::Limited { reset_after_ms, .. } => {
                Some(reset_after_ms.div_ceil(1000).max(1))
            }
            RateLimitResult::Allowed { .. } => None,
        }
    }
}

/// Storage for rate limit windows.
///
/// `hit` must perform its read-check-increment atomically per key; callers
/// run on a multi-threaded runtime.
pub trait RateLimiterStore: Send + Sync {
    /// Count one request for `key` at `now_ms` and decide whether it is admitted.
    fn hit(&self, key: &str, now_ms: u64, max_requests: u32, window_ms: u64) -> RateLimitResult;

    /// Drop entries whose window ended before `now_ms`. Returns how many were removed.
    fn sweep_expired(&self, now_ms: u64) -> usize;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store backed by a `DashMap`.
///
/// Single-process only: counters are not shared across instances.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiterStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimiterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entry for `key`.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }
}

impl RateLimiterStore for InMemoryRateLimiterStore {
    fn hit(&self, key: &str, now_ms: u64, max_requests: u32, window_ms: u64) -> RateLimitResult {
        // the entry guard holds the shard lock for the whole read-modify-write
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitEntry::fresh(now_ms, window_ms));
                RateLimitResult::Allowed {
                    limit: max_requests,
                    remaining: max_requests.saturating_sub(1),
                }
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();

                // window over..? start a new one
                if now_ms > entry.window_reset_at {
                    *entry = RateLimitEntry::fresh(now_ms, window_ms);
                    return RateLimitResult::Allowed {
                        limit: max_requests,
                        remaining: max_requests.saturating_sub(1),
                    };
                }

                // under limit
                if entry.count < max_requests {
                    entry.count += 1;
                    return RateLimitResult::Allowed {
                        limit: max_requests,
                        remaining: max_requests - entry.count,
                    };
                }

                RateLimitResult::Limited {
                    limit: max_requests,
                    reset_after_ms: entry.window_reset_at - now_ms,
                }
            }
        }
    }

    fn sweep_expired(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now_ms <= entry.window_reset_at);
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Rate limiter handle shared by the request handlers.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimiterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimiterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// In-memory store on the wall clock.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRateLimiterStore::new()), Arc::new(SystemClock))
    }

    /// Admit or reject one request from `key`.
    pub fn admit(&self, key: &str, max_requests: u32, window_ms: u64) -> bool {
        self.check(key, max_requests, window_ms).is_allowed()
    }

    /// Same decision as [`RateLimiter::admit`], with limit details.
    pub fn check(&self, key: &str, max_requests: u32, window_ms: u64) -> RateLimitResult {
        self.store.hit(key, self.clock.now_ms(), max_requests, window_ms)
    }

    pub fn check_policy(&self, key: &str, policy: RateLimitPolicy) -> RateLimitResult {
        self.check(key, policy.max_requests, policy.window_ms)
    }

    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired(self.clock.now_ms())
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}

// Sweeper - drops expired windows every `every`
pub async fn sweeper(limiter: RateLimiter, every: Duration) {
    let mut interval = tokio::time::interval(every);
    tracing::info!(?every, "Rate limit sweeper started");

    loop {
        interval.tick().await;
        let removed = limiter.sweep_expired();
        let remaining = limiter.tracked_keys();
        RATE_LIMIT_ENTRIES.set(remaining as f64);
        if removed > 0 {
            tracing::debug!(removed, remaining, "Swept expired rate limit windows");
        }
    }
}
