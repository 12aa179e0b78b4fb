use crate::error::{PhaseError, Result};
use crate::graph::{GraphKind, PhaseGraph};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

/// Tracker behaviour, read from `.ai-sop/config.yaml`. Every field has a
/// default so a partial (or absent) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub graph: GraphKind,
    /// Custom phase graph (YAML or JSON). Overrides `graph` when set.
    /// Relative paths resolve against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub require_approval_for_transitions: bool,
    #[serde(default = "default_true")]
    pub auto_log_decisions: bool,
    /// When set, a transition out of a phase the active graph does not
    /// define is rejected, and `start_session` rejects unknown phases.
    #[serde(default)]
    pub strict_phase_validation: bool,
    #[serde(default = "default_recent_decisions")]
    pub recent_decisions_limit: usize,
    #[serde(default = "default_recent_transitions")]
    pub recent_transitions_limit: usize,
    #[serde(default = "default_recent_window")]
    pub recent_window_hours: i64,
    #[serde(default = "default_checkpoint_frequency")]
    pub pbj_checkpoint_frequency_minutes: u32,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u32,
    #[serde(default = "default_dashboard_port")]
    pub dashboard_port: u16,
    #[serde(default = "default_cleanup_days")]
    pub cleanup_after_days: u32,
}

/// Ten years.
pub const MAX_RECENT_WINDOW_HOURS: i64 = 24 * 365 * 10;

fn default_true() -> bool {
    true
}

fn default_recent_decisions() -> usize {
    50
}

fn default_recent_transitions() -> usize {
    20
}

fn default_recent_window() -> i64 {
    24
}

fn default_checkpoint_frequency() -> u32 {
    30
}

fn default_session_timeout() -> u32 {
    120
}

fn default_dashboard_port() -> u16 {
    3000
}

fn default_cleanup_days() -> u32 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            graph: GraphKind::default(),
            phases_file: None,
            require_approval_for_transitions: true,
            auto_log_decisions: true,
            strict_phase_validation: false,
            recent_decisions_limit: default_recent_decisions(),
            recent_transitions_limit: default_recent_transitions(),
            recent_window_hours: default_recent_window(),
            pbj_checkpoint_frequency_minutes: default_checkpoint_frequency(),
            session_timeout_minutes: default_session_timeout(),
            dashboard_port: default_dashboard_port(),
            cleanup_after_days: default_cleanup_days(),
        }
    }
}

impl TrackerConfig {
    /// Load from `<root>/.ai-sop/config.yaml`, falling back to defaults when
    /// the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&data)
            .map_err(|e| PhaseError::Configuration(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot be turned into a time window.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RECENT_WINDOW_HOURS).contains(&self.recent_window_hours) {
            return Err(PhaseError::Configuration(format!(
                "recent_window_hours must be between 1 and {MAX_RECENT_WINDOW_HOURS}, got {}",
                self.recent_window_hours
            )));
        }
        Ok(())
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Resolve the phase graph this configuration selects.
    pub fn phase_graph(&self, root: &Path) -> Result<PhaseGraph> {
        match &self.phases_file {
            Some(file) if file.is_absolute() => PhaseGraph::load(file),
            Some(file) => PhaseGraph::load(&root.join(file)),
            None => Ok(self.graph.graph()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, TrackerConfig::default());
        assert!(cfg.require_approval_for_transitions);
        assert!(cfg.auto_log_decisions);
        assert!(!cfg.strict_phase_validation);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
        std::fs::write(
            dir.path().join(".ai-sop/config.yaml"),
            "graph: development\nrequire_approval_for_transitions: false\n",
        )
        .unwrap();
        let cfg = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.graph, GraphKind::Development);
        assert!(!cfg.require_approval_for_transitions);
        assert_eq!(cfg.recent_decisions_limit, 50);
        assert_eq!(cfg.dashboard_port, 3000);
    }

    #[test]
    fn malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
        std::fs::write(dir.path().join(".ai-sop/config.yaml"), "graph: [oops\n").unwrap();
        let err = TrackerConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, PhaseError::Configuration(_)));
    }

    #[test]
    fn out_of_range_recent_window_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
        for hours in ["0", "-5", "9223372036854775807"] {
            std::fs::write(
                dir.path().join(".ai-sop/config.yaml"),
                format!("recent_window_hours: {hours}\n"),
            )
            .unwrap();
            let err = TrackerConfig::load(dir.path()).unwrap_err();
            assert!(matches!(err, PhaseError::Configuration(_)), "{hours}");
        }
        std::fs::write(dir.path().join(".ai-sop/config.yaml"), "recent_window_hours: 48\n").unwrap();
        assert_eq!(TrackerConfig::load(dir.path()).unwrap().recent_window_hours, 48);
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = TrackerConfig {
            strict_phase_validation: true,
            dashboard_port: 4100,
            ..TrackerConfig::default()
        };
        cfg.save(dir.path()).unwrap();
        assert_eq!(TrackerConfig::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn relative_phases_file_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("phases.yaml"),
            "phases:\n  - id: a\n    name: A\n    nextPhases: [b]\n  - id: b\n    name: B\n",
        )
        .unwrap();
        let cfg = TrackerConfig {
            phases_file: Some(PathBuf::from("phases.yaml")),
            ..TrackerConfig::default()
        };
        let graph = cfg.phase_graph(dir.path()).unwrap();
        assert_eq!(graph.starting_phase(), Some("a"));
    }

    #[test]
    fn missing_phases_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let cfg = TrackerConfig {
            phases_file: Some(PathBuf::from("missing.yaml")),
            ..TrackerConfig::default()
        };
        assert!(matches!(
            cfg.phase_graph(dir.path()),
            Err(PhaseError::Configuration(_))
        ));
    }
}
