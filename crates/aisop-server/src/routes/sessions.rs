use aisop_core::session::AgentSession;
use aisop_core::PhaseError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionsQuery {
    #[serde(default)]
    pub all: bool,
}

/// GET /api/sessions: active sessions; `?all=true` includes every status.
pub async fn list_sessions(
    State(app): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<AgentSession>>, AppError> {
    let tracker = app.tracker()?;
    let sessions = if query.all {
        tracker.all_sessions()
    } else {
        tracker.active_sessions()
    };
    Ok(Json(sessions.into_iter().cloned().collect()))
}

/// GET /api/sessions/{id}: one session with its full event logs.
pub async fn get_session(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentSession>, AppError> {
    let tracker = app.tracker()?;
    let session = tracker
        .session(&id)
        .cloned()
        .ok_or(PhaseError::SessionNotFound(id))?;
    Ok(Json(session))
}
