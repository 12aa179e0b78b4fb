use crate::types::{CheckpointStatus, Context, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session fields that caller context may never overwrite.
const RESERVED_KEYS: &[&str] = &[
    "agentId",
    "sessionId",
    "startTime",
    "endTime",
    "currentPhase",
    "status",
    "decisions",
    "transitions",
    "pbjCheckpoints",
];

// ---------------------------------------------------------------------------
// Event records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub phase: String,
    pub decision: String,
    pub reasoning: String,
    #[serde(default)]
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl DecisionLog {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub from_phase: String,
    pub to_phase: String,
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbjCheckpoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub phase: String,
    pub checkpoint: String,
    pub status: CheckpointStatus,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_actions: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// AgentSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub agent_id: String,
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub current_phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_cycle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub decisions: Vec<DecisionLog>,
    #[serde(default)]
    pub transitions: Vec<PhaseTransition>,
    #[serde(default)]
    pub pbj_checkpoints: Vec<PbjCheckpoint>,
    /// Any other caller-supplied metadata captured at creation.
    #[serde(flatten)]
    pub metadata: Context,
}

impl AgentSession {
    pub fn new(
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
        initial_phase: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            start_time,
            end_time: None,
            current_phase: initial_phase.into(),
            work_cycle_id: None,
            git_branch: None,
            issue_number: None,
            status: SessionStatus::Active,
            decisions: Vec::new(),
            transitions: Vec::new(),
            pbj_checkpoints: Vec::new(),
            metadata: Context::new(),
        }
    }

    /// Capture creation-time context: the well-known keys become typed
    /// fields, everything else lands in `metadata`.
    pub fn apply_context(&mut self, context: &Context) {
        for (key, value) in context {
            match key.as_str() {
                "workCycleId" | "work_cycle_id" => self.work_cycle_id = value_to_string(value),
                "gitBranch" | "git_branch" => self.git_branch = value_to_string(value),
                "issueNumber" | "issue_number" => self.issue_number = value_to_string(value),
                k if RESERVED_KEYS.contains(&k) => {
                    tracing::warn!(
                        session = %self.session_id,
                        key = k,
                        "ignoring context key that shadows a session field"
                    );
                }
                _ => {
                    self.metadata.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Elapsed minutes between start and end; `None` until the session ends.
    pub fn duration_minutes(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 60_000.0)
    }

    // -----------------------------------------------------------------------
    // Append-only event recording
    // -----------------------------------------------------------------------

    pub fn push_decision(
        &mut self,
        decision: impl Into<String>,
        reasoning: impl Into<String>,
        context: Context,
        outcome: Option<String>,
        tags: Vec<String>,
        at: DateTime<Utc>,
    ) -> &DecisionLog {
        let entry = DecisionLog {
            id: format!("{}-decision-{}", self.session_id, self.decisions.len() + 1),
            timestamp: at,
            agent_id: self.agent_id.clone(),
            phase: self.current_phase.clone(),
            decision: decision.into(),
            reasoning: reasoning.into(),
            context,
            outcome,
            tags,
        };
        self.decisions.push(entry);
        &self.decisions[self.decisions.len() - 1]
    }

    /// Record a transition and move `current_phase`. Validation happens in
    /// the tracker before this is called.
    pub fn push_transition(
        &mut self,
        to_phase: impl Into<String>,
        trigger: impl Into<String>,
        approved_by: Option<String>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> &PhaseTransition {
        let to_phase = to_phase.into();
        let entry = PhaseTransition {
            id: format!("{}-transition-{}", self.session_id, self.transitions.len() + 1),
            timestamp: at,
            agent_id: self.agent_id.clone(),
            from_phase: std::mem::replace(&mut self.current_phase, to_phase.clone()),
            to_phase,
            trigger: trigger.into(),
            approved_by,
            notes,
            context: Context::new(),
        };
        self.transitions.push(entry);
        &self.transitions[self.transitions.len() - 1]
    }

    pub fn push_checkpoint(
        &mut self,
        checkpoint: impl Into<String>,
        status: CheckpointStatus,
        details: impl Into<String>,
        improvement_actions: Option<Vec<String>>,
        at: DateTime<Utc>,
    ) -> &PbjCheckpoint {
        let entry = PbjCheckpoint {
            id: format!("{}-pbj-{}", self.session_id, self.pbj_checkpoints.len() + 1),
            timestamp: at,
            agent_id: self.agent_id.clone(),
            phase: self.current_phase.clone(),
            checkpoint: checkpoint.into(),
            status,
            details: details.into(),
            improvement_actions,
        };
        self.pbj_checkpoints.push(entry);
        &self.pbj_checkpoints[self.pbj_checkpoints.len() - 1]
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
