use axum::http::{HeaderMap, StatusCode};
use axum::{Json, extract::State};
use std::sync::Arc;

use super::enforce;
use crate::error::ApiError;
use crate::metrics::{EVENTS_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{TrackRequest, TrackResponse};
use crate::session::{SESSION_HEADER, client_key, session_id};
use crate::state::AppState;

pub async fn track_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TrackRequest>,
) -> Result<(StatusCode, Json<TrackResponse>), ApiError> {
    REQUEST_TOTAL.inc();
    let _timer = REQUEST_LATENCY.start_timer();

    let client = client_key(&headers);
    enforce(&state, "track", &client, state.policies.track)?;

    let session = session_id(&headers)
        .ok_or_else(|| ApiError::BadRequest(format!("{SESSION_HEADER} header is required")))?;
    if payload.event.trim().is_empty() {
        return Err(ApiError::BadRequest("event is required".to_string()));
    }
    if state.assignor.catalog().get(&payload.experiment).is_none() {
        return Err(ApiError::NotFound(format!("unknown experiment {}", payload.experiment)));
    }

    let outcome = state
        .tracker
        .record_event(&state.assignor, &session, &payload.experiment, &payload.event);

    if outcome.counted() {
        EVENTS_TOTAL
            .with_label_values(&[payload.experiment.as_str(), payload.event.as_str()])
            .inc();
        tracing::debug!(
            session = %session,
            experiment = %payload.experiment,
            event = %payload.event,
            "Event counted"
        );
    }

    let body = TrackResponse {
        variant: outcome.variant().map(str::to_string),
        counted: outcome.counted(),
        experiment: payload.experiment,
    };
    Ok((StatusCode::ACCEPTED, Json(body)))
}
