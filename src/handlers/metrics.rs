use axum::extract::State;
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::{RATE_LIMIT_ENTRIES, SESSIONS};
use crate::state::AppState;

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    RATE_LIMIT_ENTRIES.set(state.rate_limiter.tracked_keys() as f64);
    SESSIONS.set(state.assignor.session_count() as f64);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))?;
    String::from_utf8(buffer).map_err(|e| ApiError::Internal(format!("metrics are not UTF-8: {e}")))
}
