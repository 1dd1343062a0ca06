use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Json, extract::State};
use std::sync::Arc;

use super::enforce;
use crate::error::ApiError;
use crate::metrics::{ASSIGNMENTS_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL, SESSIONS};
use crate::models::{VariantRequest, VariantResponse};
use crate::session::{SESSION_HEADER, client_key, mint_session_id, session_id};
use crate::state::AppState;

pub async fn variant_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VariantRequest>,
) -> Result<Response, ApiError> {
    REQUEST_TOTAL.inc();
    let _timer = REQUEST_LATENCY.start_timer();

    let client = client_key(&headers);
    enforce(&state, "variant", &client, state.policies.variant)?;

    if payload.experiment.trim().is_empty() {
        return Err(ApiError::BadRequest("experiment is required".to_string()));
    }

    // minted ids are echoed back so the page can keep them
    let session = session_id(&headers).unwrap_or_else(|| mint_session_id(&client));

    let assignment = state
        .assignor
        .assign(&session, &payload.experiment, payload.salt.as_deref());

    let (variant, fallback) = match assignment {
        Some(assignment) => {
            if assignment.newly_assigned {
                state
                    .tracker
                    .record_assignment(&payload.experiment, &assignment.variant);
                ASSIGNMENTS_TOTAL
                    .with_label_values(&[payload.experiment.as_str(), assignment.variant.as_str()])
                    .inc();
                SESSIONS.set(state.assignor.session_count() as f64);
                tracing::debug!(
                    session = %session,
                    experiment = %payload.experiment,
                    variant = %assignment.variant,
                    "New assignment"
                );
            }
            (Some(assignment.variant), false)
        }
        // unknown or inactive experiment
        None => (payload.default.clone(), true),
    };

    let body = VariantResponse {
        experiment: payload.experiment,
        variant,
        session_id: session.clone(),
        fallback,
    };

    let mut response = Json(body).into_response();
    if let Ok(value) = HeaderValue::from_str(&session) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    Ok(response)
}
