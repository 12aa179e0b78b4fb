use aisop_core::stats::DashboardStats;
use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/stats: aggregate dashboard statistics, recomputed per request.
pub async fn get_stats(State(app): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let stats = app.tracker()?.dashboard_stats();
    Ok(Json(stats))
}
