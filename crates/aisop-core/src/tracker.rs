//! The phase tracker: owns every session for the life of the process,
//! validates transitions against the active phase graph and persists each
//! mutation before returning.

use crate::config::TrackerConfig;
use crate::error::{PhaseError, Result};
use crate::graph::{PhaseDefinition, PhaseGraph};
use crate::session::AgentSession;
use crate::stats::{DashboardStats, RecentWindow};
use crate::store::SessionStore;
use crate::types::{CheckpointStatus, Context, SessionStatus};
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

pub const PBJ_FAILURE_TAG: &str = "pbj-failure";
pub const QUALITY_ISSUE_TAG: &str = "quality-issue";

/// Result of [`PhaseTracker::end_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Ended,
    AlreadyCompleted,
    NotFound,
}

#[derive(Debug)]
pub struct PhaseTracker {
    config: TrackerConfig,
    graph: PhaseGraph,
    store: SessionStore,
    sessions: HashMap<String, AgentSession>,
    last_stamp_ms: i64,
}

impl PhaseTracker {
    /// Open the tracker for a project root: read `.ai-sop/config.yaml`,
    /// resolve the phase graph and load every stored session.
    pub fn open(root: &Path) -> Result<Self> {
        let config = TrackerConfig::load(root)?;
        let graph = config.phase_graph(root)?;
        Self::new(SessionStore::for_root(root), config, graph)
    }

    pub fn new(store: SessionStore, config: TrackerConfig, graph: PhaseGraph) -> Result<Self> {
        store.ensure_dir()?;
        let mut tracker = Self {
            config,
            graph,
            store,
            sessions: HashMap::new(),
            last_stamp_ms: 0,
        };
        tracker.reload()?;
        Ok(tracker)
    }

    /// Replace the in-memory session map with what is on disk.
    pub fn reload(&mut self) -> Result<usize> {
        let loaded = self.store.load_all()?;
        self.sessions = loaded
            .into_iter()
            .map(|s| (s.session_id.clone(), s))
            .collect();
        tracing::debug!(count = self.sessions.len(), dir = %self.store.dir().display(), "loaded sessions");
        Ok(self.sessions.len())
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Phase graph
    // -----------------------------------------------------------------------

    pub fn phase_graph(&self) -> &PhaseGraph {
        &self.graph
    }

    pub fn phases(&self) -> &[PhaseDefinition] {
        &self.graph.phases
    }

    /// Swap the active graph. Sessions already sitting in phases the new
    /// graph does not define are left alone.
    pub fn set_phase_graph(&mut self, graph: PhaseGraph) {
        tracing::debug!(from = %self.graph.name, to = %graph.name, "switching phase graph");
        self.graph = graph;
    }

    pub fn use_constitution_phases(&mut self) {
        self.set_phase_graph(PhaseGraph::constitution());
    }

    pub fn use_development_cycle_phases(&mut self) {
        self.set_phase_graph(PhaseGraph::development());
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Create, persist and return a new active session. `initial_phase`
    /// defaults to the graph's first phase and is only checked against the
    /// graph in strict mode.
    pub fn start_session(
        &mut self,
        agent_id: &str,
        initial_phase: Option<&str>,
        context: Context,
    ) -> Result<&AgentSession> {
        let phase = initial_phase
            .or_else(|| self.graph.starting_phase())
            .unwrap_or("discovery")
            .to_string();
        if self.config.strict_phase_validation && !self.graph.contains(&phase) {
            return Err(PhaseError::UnknownPhase(phase));
        }

        let now = Utc::now();
        let mut stamp = now.timestamp_millis().max(self.last_stamp_ms + 1);
        while self.sessions.contains_key(&format!("{agent_id}-{stamp}")) {
            stamp += 1;
        }
        self.last_stamp_ms = stamp;
        let session_id = format!("{agent_id}-{stamp}");

        let mut session = AgentSession::new(agent_id, session_id.clone(), phase.clone(), now);
        session.apply_context(&context);
        session.push_decision(
            "Session started",
            format!("Agent {agent_id} initialized in {phase} phase"),
            context,
            None,
            Vec::new(),
            now,
        );
        persist(&self.store, &session);
        tracing::info!(session = %session_id, agent = agent_id, phase = %phase, "session started");

        Ok(self.sessions.entry(session_id).or_insert(session))
    }

    /// Complete a session. Unknown ids are reported through the return
    /// value rather than an error.
    pub fn end_session(&mut self, session_id: &str, outcome: Option<&str>) -> EndOutcome {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::debug!(session = session_id, "end requested for unknown session");
            return EndOutcome::NotFound;
        };
        if session.status.is_terminal() {
            return EndOutcome::AlreadyCompleted;
        }

        let now = Utc::now();
        session.end_time = Some(now);
        session.status = SessionStatus::Completed;
        if let Some(outcome) = outcome {
            session.push_decision(
                "Session completed",
                outcome,
                Context::new(),
                Some(outcome.to_string()),
                Vec::new(),
                now,
            );
        }
        persist(&self.store, session);
        tracing::info!(session = session_id, "session completed");
        EndOutcome::Ended
    }

    /// Pause, resume or flag a session as errored. Completion goes through
    /// [`end_session`](Self::end_session) and is final.
    pub fn update_status(&mut self, session_id: &str, status: SessionStatus) -> Result<()> {
        if status.is_terminal() {
            return Err(PhaseError::InvalidStatus(format!(
                "'{status}' is set by ending the session"
            )));
        }
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| PhaseError::SessionNotFound(session_id.to_string()))?;
        if session.status.is_terminal() {
            return Err(PhaseError::SessionClosed(session_id.to_string()));
        }
        if session.status == status {
            return Ok(());
        }

        let from = session.status;
        session.status = status;
        let mut context = Context::new();
        context.insert("fromStatus".into(), json!(from));
        context.insert("toStatus".into(), json!(status));
        session.push_decision(
            "Session status changed",
            format!("Status changed from {from} to {status}"),
            context,
            None,
            Vec::new(),
            Utc::now(),
        );
        persist(&self.store, session);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions and events
    // -----------------------------------------------------------------------

    /// Move a session to `to_phase`. Every rejection leaves the session
    /// untouched; success always returns `true`.
    pub fn transition_phase(
        &mut self,
        session_id: &str,
        to_phase: &str,
        trigger: &str,
        approved_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| PhaseError::SessionNotFound(session_id.to_string()))?;
        let from_phase = session.current_phase.clone();

        match self.graph.get(&from_phase) {
            Some(def) if !def.allows(to_phase) => {
                return Err(PhaseError::InvalidTransition {
                    from: from_phase,
                    to: to_phase.to_string(),
                    reason: format!("allowed next phases: {}", def.next_phases.join(", ")),
                });
            }
            Some(_) => {}
            None if self.config.strict_phase_validation => {
                return Err(PhaseError::InvalidTransition {
                    from: from_phase,
                    to: to_phase.to_string(),
                    reason: format!("current phase is not defined in graph '{}'", self.graph.name),
                });
            }
            None => {
                tracing::debug!(
                    session = session_id,
                    phase = %from_phase,
                    graph = %self.graph.name,
                    "current phase not in active graph; transition unchecked"
                );
            }
        }

        let approved_by = approved_by.filter(|a| !a.trim().is_empty());
        if self.config.require_approval_for_transitions && approved_by.is_none() {
            return Err(PhaseError::ApprovalRequired {
                from: from_phase,
                to: to_phase.to_string(),
            });
        }

        let now = Utc::now();
        session.push_transition(
            to_phase,
            trigger,
            approved_by.map(str::to_string),
            notes.map(str::to_string),
            now,
        );

        let mut context = Context::new();
        context.insert("fromPhase".into(), json!(from_phase));
        context.insert("toPhase".into(), json!(to_phase));
        context.insert("trigger".into(), json!(trigger));
        if let Some(approver) = approved_by {
            context.insert("approvedBy".into(), json!(approver));
        }
        session.push_decision(
            "Phase transition",
            format!("Transitioned from {from_phase} to {to_phase}: {trigger}"),
            context,
            None,
            Vec::new(),
            now,
        );
        persist(&self.store, session);
        tracing::info!(session = session_id, from = %from_phase, to = to_phase, "phase transition");
        Ok(true)
    }

    pub fn log_decision(
        &mut self,
        session_id: &str,
        decision: &str,
        reasoning: &str,
        context: Context,
        outcome: Option<&str>,
        tags: Vec<String>,
    ) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| PhaseError::SessionNotFound(session_id.to_string()))?;
        session.push_decision(
            decision,
            reasoning,
            context,
            outcome.map(str::to_string),
            tags,
            Utc::now(),
        );
        persist(&self.store, session);
        Ok(())
    }

    /// Record a PB&J checkpoint. A failing checkpoint also lands in the
    /// decision log (tagged for quality follow-up) when auto-logging is on.
    pub fn record_pbj_checkpoint(
        &mut self,
        session_id: &str,
        checkpoint: &str,
        status: CheckpointStatus,
        details: &str,
        improvement_actions: Option<Vec<String>>,
    ) -> Result<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| PhaseError::SessionNotFound(session_id.to_string()))?;

        let now = Utc::now();
        session.push_checkpoint(checkpoint, status, details, improvement_actions.clone(), now);

        if status == CheckpointStatus::Fail && self.config.auto_log_decisions {
            let mut context = Context::new();
            context.insert("checkpoint".into(), json!(checkpoint));
            context.insert("status".into(), json!(status));
            context.insert("details".into(), json!(details));
            if let Some(actions) = &improvement_actions {
                context.insert("improvementActions".into(), json!(actions));
            }
            session.push_decision(
                "PB&J checkpoint failed",
                format!("Failed checkpoint: {checkpoint}. {details}"),
                context,
                None,
                vec![PBJ_FAILURE_TAG.to_string(), QUALITY_ISSUE_TAG.to_string()],
                now,
            );
            tracing::warn!(session = session_id, checkpoint, "PB&J checkpoint failed");
        }
        persist(&self.store, session);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn dashboard_stats(&self) -> DashboardStats {
        let window = RecentWindow {
            hours: self.config.recent_window_hours,
            max_decisions: self.config.recent_decisions_limit,
            max_transitions: self.config.recent_transitions_limit,
        };
        DashboardStats::compute(self.sessions.values(), window, Utc::now())
    }

    pub fn session(&self, session_id: &str) -> Option<&AgentSession> {
        self.sessions.get(session_id)
    }

    pub fn current_phase(&self, session_id: &str) -> Option<&str> {
        self.session(session_id).map(|s| s.current_phase.as_str())
    }

    /// All sessions, oldest first.
    pub fn all_sessions(&self) -> Vec<&AgentSession> {
        self.sorted(|_| true)
    }

    pub fn active_sessions(&self) -> Vec<&AgentSession> {
        self.sorted(|s| s.is_active())
    }

    pub fn agent_sessions(&self, agent_id: &str) -> Vec<&AgentSession> {
        self.sorted(|s| s.agent_id == agent_id)
    }

    fn sorted(&self, keep: impl Fn(&AgentSession) -> bool) -> Vec<&AgentSession> {
        let mut out: Vec<&AgentSession> = self.sessions.values().filter(|s| keep(s)).collect();
        out.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        out
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Delete completed sessions that started more than `older_than_days`
    /// ago. Sessions in any other status are kept regardless of age.
    pub fn cleanup_old_sessions(&mut self, older_than_days: u32) -> usize {
        // A cutoff before chrono's minimum date means nothing is old enough.
        let Some(cutoff) = Duration::try_days(i64::from(older_than_days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return 0;
        };
        let expired: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Completed && s.start_time < cutoff)
            .map(|s| s.session_id.clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            match self.store.remove(&id) {
                Ok(()) => {
                    self.sessions.remove(&id);
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(session = %id, error = %e, "failed to clean up session");
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, older_than_days, "cleaned up old sessions");
        }
        removed
    }
}

/// Write-through after a mutation. Failures are logged and the in-memory
/// state is kept.
fn persist(store: &SessionStore, session: &AgentSession) {
    if let Err(e) = store.save(session) {
        tracing::error!(session = %session.session_id, error = %e, "failed to persist session");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
