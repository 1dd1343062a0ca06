use axum::http::HeaderMap;
use axum::{Json, extract::State};
use std::sync::Arc;

use super::enforce;
use crate::error::ApiError;
use crate::metrics::{LEADS_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ContactRequest, ContactResponse};
use crate::session::client_key;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 5_000;

fn validate(form: &ContactRequest) -> Result<(), ApiError> {
    if form.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let email = form.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.') && !domain.ends_with('.'));
    if !valid_email {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }

    if form.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }
    if form.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest(format!(
            "message is longer than {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

// Contact form - leads are only logged, there is no CRM behind this
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    REQUEST_TOTAL.inc();
    let _timer = REQUEST_LATENCY.start_timer();

    let client = client_key(&headers);
    enforce(&state, "contact", &client, state.policies.contact)?;
    validate(&payload)?;

    LEADS_TOTAL.inc();
    tracing::info!(
        name = %payload.name.trim(),
        email = %payload.email.trim(),
        company = payload.company.as_deref().unwrap_or("-"),
        message_len = payload.message.len(),
        "New contact lead"
    );

    Ok(Json(ContactResponse {
        status: "received".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            company: None,
        }
    }

    #[test]
    fn accepts_complete_form() {
        assert!(validate(&form("Ada", "ada@example.com", "Tell me more")).is_ok());
    }

    #[test]
    fn rejects_incomplete_form() {
        assert!(validate(&form("", "ada@example.com", "hi")).is_err());
        assert!(validate(&form("Ada", "ada.example.com", "hi")).is_err());
        assert!(validate(&form("Ada", "@example.com", "hi")).is_err());
        assert!(validate(&form("Ada", "ada@example.", "hi")).is_err());
        assert!(validate(&form("Ada", "ada@example.com", "   ")).is_err());
        assert!(validate(&form("Ada", "ada@example.com", &"x".repeat(MAX_MESSAGE_LEN + 1))).is_err());
    }
}
