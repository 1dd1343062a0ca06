//! Rate-limited, session-sticky A/B variant assignment for the marketing site.
//!
//! Two leaf mechanisms do the work: [`rate_limit::RateLimiter`] (fixed-window
//! counter per client key) and [`assignment::VariantAssignor`] (deterministic
//! weighted bucketing with first-write-wins stickiness). Both sit behind store
//! traits so the in-memory maps can be swapped for a shared cache.

pub mod assignment;
pub mod clock;
pub mod config;
pub mod error;
pub mod experiments;
pub mod handlers;
pub mod hash;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod tracking;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::state::AppState;

// creating the router with routes
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/variant", post(handlers::variant_handler))
        .route("/api/track", post(handlers::track_handler))
        .route("/api/contact", post(handlers::contact_handler))
        .route("/api/experiments", get(handlers::list_experiments_handler))
        .route(
            "/api/experiments/{name}/results",
            get(handlers::experiment_results_handler),
        )
        .with_state(state)
}
