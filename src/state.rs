use std::time::Duration;

use crate::assignment::VariantAssignor;
use crate::experiments::ExperimentCatalog;
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::tracking::ResultTracker;

// Per-endpoint rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    pub contact: RateLimitPolicy,
    pub track: RateLimitPolicy,
    pub variant: RateLimitPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        Self {
            contact: RateLimitPolicy::new(3, minute),
            track: RateLimitPolicy::new(50, minute),
            variant: RateLimitPolicy::new(100, minute),
        }
    }
}

// app's shared state
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub assignor: VariantAssignor,
    pub tracker: ResultTracker,
    pub policies: Policies,
}

impl AppState {
    // In-memory stores on the wall clock
    pub fn new(catalog: ExperimentCatalog, policies: Policies) -> Self {
        Self::with_stores(RateLimiter::in_memory(), VariantAssignor::in_memory(catalog), policies)
    }

    pub fn with_stores(rate_limiter: RateLimiter, assignor: VariantAssignor, policies: Policies) -> Self {
        Self {
            rate_limiter,
            assignor,
            tracker: ResultTracker::new(),
            policies,
        }
    }
}
