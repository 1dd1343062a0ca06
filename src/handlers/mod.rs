mod contact;
mod experiments;
mod health;
mod metrics;
mod track;
mod variant;

pub use contact::contact_handler;
pub use experiments::{experiment_results_handler, list_experiments_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use track::track_handler;
pub use variant::variant_handler;

use crate::error::ApiError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::rate_limit::RateLimitPolicy;
use crate::state::AppState;

// Rate limit check - keys are namespaced per endpoint so policies don't share counters
fn enforce(state: &AppState, endpoint: &str, client: &str, policy: RateLimitPolicy) -> Result<(), ApiError> {
    let result = state
        .rate_limiter
        .check_policy(&format!("{endpoint}:{client}"), policy);

    match result.retry_after_secs() {
        None => Ok(()),
        Some(retry_after_secs) => {
            RATE_LIMITED_TOTAL.with_label_values(&[endpoint]).inc();
            tracing::warn!(endpoint, client, retry_after_secs, "Rate limit exceeded");
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}
