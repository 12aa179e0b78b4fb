//! Phase graphs: the set of phases a session may occupy and the directed
//! edges between them.

use crate::error::{PhaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// PhaseDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub entry_conditions: Vec<String>,
    #[serde(default)]
    pub exit_conditions: Vec<String>,
    #[serde(default)]
    pub next_phases: Vec<String>,
}

impl PhaseDefinition {
    pub fn allows(&self, to_phase: &str) -> bool {
        self.next_phases.iter().any(|p| p == to_phase)
    }
}

// ---------------------------------------------------------------------------
// GraphKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    #[default]
    Constitution,
    Development,
}

impl GraphKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphKind::Constitution => "constitution",
            GraphKind::Development => "development",
        }
    }

    pub fn graph(self) -> PhaseGraph {
        match self {
            GraphKind::Constitution => PhaseGraph::constitution(),
            GraphKind::Development => PhaseGraph::development(),
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PhaseGraph
// ---------------------------------------------------------------------------

/// An ordered, named collection of phase definitions. The first phase is the
/// designated starting phase for new sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseGraph {
    #[serde(default = "default_graph_name")]
    pub name: String,
    pub phases: Vec<PhaseDefinition>,
}

fn default_graph_name() -> String {
    "custom".to_string()
}

impl PhaseGraph {
    pub fn new(name: impl Into<String>, phases: Vec<PhaseDefinition>) -> Self {
        Self {
            name: name.into(),
            phases,
        }
    }

    pub fn get(&self, id: &str) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn starting_phase(&self) -> Option<&str> {
        self.phases.first().map(|p| p.id.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|p| p.id.as_str())
    }

    /// Check that ids are unique and every `next_phases` entry resolves.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(PhaseError::Configuration(format!(
                "phase graph '{}' has no phases",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.id.as_str()) {
                return Err(PhaseError::Configuration(format!(
                    "phase graph '{}' defines '{}' more than once",
                    self.name, phase.id
                )));
            }
        }
        for phase in &self.phases {
            for next in &phase.next_phases {
                if !seen.contains(next.as_str()) {
                    return Err(PhaseError::Configuration(format!(
                        "phase '{}' in graph '{}' points at undefined phase '{}'",
                        phase.id, self.name, next
                    )));
                }
            }
        }
        Ok(())
    }

    /// Load a graph from a YAML or JSON file (chosen by extension) and
    /// validate it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PhaseError::Configuration(format!(
                "phase graph file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let graph: PhaseGraph = if is_json {
            serde_json::from_str(&data).map_err(|e| {
                PhaseError::Configuration(format!("{}: {e}", path.display()))
            })?
        } else {
            serde_yaml::from_str(&data).map_err(|e| {
                PhaseError::Configuration(format!("{}: {e}", path.display()))
            })?
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn constitution() -> Self {
        Self::new(
            GraphKind::Constitution.as_str(),
            vec![
                phase(
                    "discovery",
                    "Discovery",
                    "Understanding requirements and exploring options",
                    &[
                        "Analyze user requirements and context",
                        "Research existing solutions and patterns",
                        "Identify constraints and dependencies",
                        "Define problem scope and boundaries",
                    ],
                    &[
                        "New work cycle initiated",
                        "Requirements gathering needed",
                        "Problem definition required",
                    ],
                    &[
                        "Problem clearly defined",
                        "Requirements documented",
                        "Solution approach identified",
                    ],
                    &["build"],
                ),
                phase(
                    "build",
                    "Build",
                    "Creating the solution and implementation",
                    &[
                        "Design system architecture",
                        "Implement core functionality",
                        "Write tests and documentation",
                        "Ensure code quality standards",
                    ],
                    &[
                        "Requirements clearly defined",
                        "Solution approach approved",
                        "Resources allocated",
                    ],
                    &[
                        "Core functionality implemented",
                        "Tests passing",
                        "Code review completed",
                    ],
                    &["delivery"],
                ),
                phase(
                    "delivery",
                    "Delivery",
                    "Testing, validation, and deployment",
                    &[
                        "Validate solution meets requirements",
                        "Perform integration testing",
                        "Deploy to target environment",
                        "Monitor initial performance",
                    ],
                    &[
                        "Implementation completed",
                        "Quality checks passed",
                        "Deployment environment ready",
                    ],
                    &[
                        "Solution deployed successfully",
                        "Performance metrics acceptable",
                        "User acceptance achieved",
                    ],
                    &["feedback"],
                ),
                phase(
                    "feedback",
                    "Feedback",
                    "Review, iteration, and improvement",
                    &[
                        "Collect user feedback",
                        "Analyze performance metrics",
                        "Identify improvement opportunities",
                        "Plan next iteration if needed",
                    ],
                    &[
                        "Solution deployed",
                        "Initial usage data available",
                        "Feedback collection mechanisms active",
                    ],
                    &[
                        "Feedback analyzed",
                        "Improvements prioritized",
                        "Next steps planned",
                    ],
                    &["discovery", "build"],
                ),
            ],
        )
    }

    pub fn development() -> Self {
        Self::new(
            GraphKind::Development.as_str(),
            vec![
                phase(
                    "discovery",
                    "Discovery",
                    "Research and problem analysis",
                    &[
                        "Research existing solutions",
                        "Analyze problem domain",
                        "Define requirements",
                    ],
                    &["New development work needed"],
                    &["Problem clearly defined"],
                    &["planning"],
                ),
                phase(
                    "planning",
                    "Planning",
                    "Feature analysis and task planning",
                    &[
                        "Apply Lighthouse Protocol",
                        "Create GitHub issues",
                        "Plan work breakdown",
                    ],
                    &["Requirements defined"],
                    &["Work plan approved"],
                    &["development"],
                ),
                phase(
                    "development",
                    "Development",
                    "Implementation and coding",
                    &[
                        "Follow Git workflow",
                        "Implement features",
                        "Make structured commits",
                    ],
                    &["Work plan ready"],
                    &["Implementation complete"],
                    &["quality"],
                ),
                phase(
                    "quality",
                    "Quality",
                    "Testing and documentation",
                    &[
                        "Run automated tests",
                        "Update documentation",
                        "Perform code review",
                    ],
                    &["Implementation complete"],
                    &["Quality gates passed"],
                    &["discovery", "planning"],
                ),
            ],
        )
    }
}

impl Default for PhaseGraph {
    fn default() -> Self {
        Self::constitution()
    }
}

fn phase(
    id: &str,
    name: &str,
    description: &str,
    objectives: &[&str],
    entry: &[&str],
    exit: &[&str],
    next: &[&str],
) -> PhaseDefinition {
    PhaseDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        objectives: owned(objectives),
        entry_conditions: owned(entry),
        exit_conditions: owned(exit),
        next_phases: owned(next),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
