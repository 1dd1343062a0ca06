use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors raised while loading the experiment catalog
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid experiments file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Experiment with empty name")]
    EmptyName,

    #[error("Duplicate experiment: {0}")]
    DuplicateExperiment(String),

    #[error("Experiment {0} has no variants")]
    NoVariants(String),

    #[error("Experiment {name} has {variants} variants but {weights} weights")]
    LengthMismatch {
        name: String,
        variants: usize,
        weights: usize,
    },

    #[error("Experiment {name} weights sum to {sum}, expected 100")]
    BadDistribution { name: String, sum: u32 },

    #[error("Experiment {name} lists variant {variant} more than once")]
    DuplicateVariant { name: String, variant: String },
}

/// Errors returned by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited { retry_after_secs: u64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Internal(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "retryable": self.retryable(),
            }
        });
        let mut response = (self.status_code(), Json(body)).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
