use aisop_core::PhaseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<PhaseError>() {
            Some(PhaseError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            Some(PhaseError::InvalidTransition { .. } | PhaseError::ApprovalRequired { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Some(PhaseError::UnknownPhase(_) | PhaseError::InvalidStatus(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(PhaseError::SessionClosed(_)) => StatusCode::CONFLICT,
            Some(
                PhaseError::Configuration(_)
                | PhaseError::Io(_)
                | PhaseError::Yaml(_)
                | PhaseError::Json(_),
            )
            | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "dashboard request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
