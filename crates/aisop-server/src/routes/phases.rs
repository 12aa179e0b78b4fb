use aisop_core::graph::PhaseDefinition;
use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/phases: definitions of the active phase graph.
pub async fn list_phases(
    State(app): State<AppState>,
) -> Result<Json<Vec<PhaseDefinition>>, AppError> {
    let phases = app.tracker()?.phases().to_vec();
    Ok(Json(phases))
}
