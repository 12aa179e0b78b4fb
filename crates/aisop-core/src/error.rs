use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid phase transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("phase transition from {from} to {to} requires approval (--approved-by)")]
    ApprovalRequired { from: String, to: String },

    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("session already completed: {0}")]
    SessionClosed(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhaseError>;
