use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form metadata attached to sessions, decisions and transitions.
pub type Context = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Paused,
    Error,
}

impl SessionStatus {
    pub fn all() -> &'static [SessionStatus] {
        &[
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Paused,
            SessionStatus::Error,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Paused => "paused",
            SessionStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = crate::error::PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "paused" => Ok(SessionStatus::Paused),
            "error" => Ok(SessionStatus::Error),
            _ => Err(crate::error::PhaseError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CheckpointStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pass,
    Fail,
    Pending,
}

impl CheckpointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointStatus::Pass => "pass",
            CheckpointStatus::Fail => "fail",
            CheckpointStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckpointStatus {
    type Err = crate::error::PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(CheckpointStatus::Pass),
            "fail" => Ok(CheckpointStatus::Fail),
            "pending" => Ok(CheckpointStatus::Pending),
            _ => Err(crate::error::PhaseError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_status_parse() {
        for status in SessionStatus::all() {
            assert_eq!(SessionStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert!(SessionStatus::from_str("running").is_err());
    }

    #[test]
    fn checkpoint_status_parse() {
        assert_eq!(CheckpointStatus::from_str("fail").unwrap(), CheckpointStatus::Fail);
        assert!(CheckpointStatus::from_str("FAIL").is_err());
    }

    #[test]
    fn only_completed_is_terminal() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
        assert!(!SessionStatus::Error.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
        let json = serde_json::to_string(&CheckpointStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
