use crate::session::{AgentSession, DecisionLog, PhaseTransition};
use crate::types::CheckpointStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds for the "recent activity" sections of [`DashboardStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentWindow {
    pub hours: i64,
    pub max_decisions: usize,
    pub max_transitions: usize,
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self {
            hours: 24,
            max_decisions: 50,
            max_transitions: 20,
        }
    }
}

/// Aggregate view over every known session. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    /// Current phase → number of active sessions in it.
    pub phase_distribution: BTreeMap<String, usize>,
    pub recent_decisions: Vec<DecisionLog>,
    pub recent_transitions: Vec<PhaseTransition>,
    /// Percentage of checkpoints that passed; 100 when there are none.
    pub pbj_success_rate: f64,
    /// Mean duration of completed sessions, in minutes.
    pub avg_session_duration: f64,
}

impl DashboardStats {
    pub fn compute<'a>(
        sessions: impl IntoIterator<Item = &'a AgentSession>,
        window: RecentWindow,
        now: DateTime<Utc>,
    ) -> Self {
        let sessions: Vec<&AgentSession> = sessions.into_iter().collect();
        let cutoff = Duration::try_hours(window.hours)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut phase_distribution = BTreeMap::new();
        for s in sessions.iter().filter(|s| s.is_active()) {
            *phase_distribution.entry(s.current_phase.clone()).or_insert(0) += 1;
        }
        let active_sessions = phase_distribution.values().sum();

        let mut recent_decisions: Vec<DecisionLog> = sessions
            .iter()
            .flat_map(|s| s.decisions.iter())
            .filter(|d| d.timestamp > cutoff)
            .cloned()
            .collect();
        recent_decisions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_decisions.truncate(window.max_decisions);

        let mut recent_transitions: Vec<PhaseTransition> = sessions
            .iter()
            .flat_map(|s| s.transitions.iter())
            .filter(|t| t.timestamp > cutoff)
            .cloned()
            .collect();
        recent_transitions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_transitions.truncate(window.max_transitions);

        let (total_checks, passed) = sessions
            .iter()
            .flat_map(|s| s.pbj_checkpoints.iter())
            .fold((0usize, 0usize), |(total, passed), c| {
                (total + 1, passed + usize::from(c.status == CheckpointStatus::Pass))
            });
        let pbj_success_rate = if total_checks == 0 {
            100.0
        } else {
            round1(passed as f64 * 100.0 / total_checks as f64)
        };

        let durations: Vec<f64> = sessions
            .iter()
            .filter(|s| s.status.is_terminal())
            .filter_map(|s| s.duration_minutes())
            .collect();
        let avg_session_duration = if durations.is_empty() {
            0.0
        } else {
            round1(durations.iter().sum::<f64>() / durations.len() as f64)
        };

        Self {
            total_sessions: sessions.len(),
            active_sessions,
            phase_distribution,
            recent_decisions,
            recent_transitions,
            pbj_success_rate,
            avg_session_duration,
        }
    }
}

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
