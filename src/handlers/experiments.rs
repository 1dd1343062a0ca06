use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::experiments::ExperimentDefinition;
use crate::state::AppState;
use crate::tracking::ExperimentResults;

pub async fn list_experiments_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ExperimentDefinition>> {
    Json(state.assignor.catalog().iter().cloned().collect())
}

pub async fn experiment_results_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ExperimentResults>, ApiError> {
    let definition = state
        .assignor
        .catalog()
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("unknown experiment {name}")))?;
    Ok(Json(state.tracker.results(definition)))
}
