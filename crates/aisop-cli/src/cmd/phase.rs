use crate::output::{print_fields, print_json, print_table, truncate};
use aisop_core::session::AgentSession;
use aisop_core::types::{CheckpointStatus, Context as SessionContext, SessionStatus};
use aisop_core::{EndOutcome, PhaseError, PhaseTracker};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum PhaseSubcommand {
    /// Start a tracking session for an agent
    Start {
        agent_id: String,
        /// Initial phase (default: first phase of the active graph)
        #[arg(long)]
        phase: Option<String>,
        /// Work cycle the session belongs to
        #[arg(long = "work-cycle")]
        work_cycle: Option<String>,
        /// Git branch the agent is working on
        #[arg(long)]
        branch: Option<String>,
        /// Issue number
        #[arg(long)]
        issue: Option<String>,
    },
    /// Move a session to another phase
    Transition {
        session_id: String,
        to_phase: String,
        /// What prompted the transition
        #[arg(long, default_value = "manual transition")]
        trigger: String,
        /// Who approved the transition
        #[arg(long = "approved-by")]
        approved_by: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Log a decision against a session
    Decision {
        session_id: String,
        decision: String,
        #[arg(long, default_value = "")]
        reasoning: String,
        /// Extra context as a JSON object
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Record a PB&J quality checkpoint
    Pbj {
        session_id: String,
        checkpoint: String,
        /// pass | fail | pending
        #[arg(long, default_value = "pass")]
        status: CheckpointStatus,
        #[arg(long, default_value = "")]
        details: String,
        /// Comma-separated improvement actions
        #[arg(long)]
        actions: Option<String>,
    },
    /// Show dashboard statistics
    Stats,
    /// List sessions (active only unless --all)
    Sessions {
        #[arg(long)]
        all: bool,
    },
    /// Show one session with its event logs
    Show { session_id: String },
    /// Complete a session
    End {
        session_id: String,
        #[arg(long)]
        outcome: Option<String>,
    },
    /// Pause an active session
    Pause { session_id: String },
    /// Resume a paused or errored session
    Resume { session_id: String },
    /// Delete completed sessions older than N days
    Cleanup {
        /// Age threshold in days (default: cleanup_after_days from config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Describe the active phase graph
    Info,
    /// Serve the HTTP dashboard
    Dashboard {
        /// Port to listen on (default: dashboard_port from config)
        #[arg(long)]
        port: Option<u16>,
        /// Open the dashboard in a browser
        #[arg(long)]
        open: bool,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: PhaseSubcommand, dev_cycle: bool, json: bool) -> anyhow::Result<()> {
    let mut tracker = PhaseTracker::open(root)
        .with_context(|| format!("failed to open phase tracker at {}", root.display()))?;
    if dev_cycle {
        tracker.use_development_cycle_phases();
    }

    match subcmd {
        PhaseSubcommand::Start {
            agent_id,
            phase,
            work_cycle,
            branch,
            issue,
        } => {
            let mut context = SessionContext::new();
            for (key, value) in [
                ("workCycleId", work_cycle),
                ("gitBranch", branch),
                ("issueNumber", issue),
            ] {
                if let Some(v) = value {
                    context.insert(key.to_string(), serde_json::Value::String(v));
                }
            }
            start(&mut tracker, &agent_id, phase.as_deref(), context, json)
        }
        PhaseSubcommand::Transition {
            session_id,
            to_phase,
            trigger,
            approved_by,
            notes,
        } => transition(
            &mut tracker,
            &session_id,
            &to_phase,
            &trigger,
            approved_by.as_deref(),
            notes.as_deref(),
            json,
        ),
        PhaseSubcommand::Decision {
            session_id,
            decision,
            reasoning,
            context,
            outcome,
            tags,
        } => {
            let context = parse_context(context.as_deref())?;
            let tags = split_csv(tags.as_deref());
            tracker
                .log_decision(&session_id, &decision, &reasoning, context, outcome.as_deref(), tags)
                .with_context(|| format!("failed to log decision for '{session_id}'"))?;
            report_last(&tracker, &session_id, json, |s| {
                s.decisions.last().map(|d| serde_json::json!(d))
            })?;
            if !json {
                println!("Decision logged for {session_id}: {decision}");
            }
            Ok(())
        }
        PhaseSubcommand::Pbj {
            session_id,
            checkpoint,
            status,
            details,
            actions,
        } => {
            let actions = actions.as_deref().map(|a| split_csv(Some(a)));
            tracker
                .record_pbj_checkpoint(&session_id, &checkpoint, status, &details, actions)
                .with_context(|| format!("failed to record checkpoint for '{session_id}'"))?;
            report_last(&tracker, &session_id, json, |s| {
                s.pbj_checkpoints.last().map(|c| serde_json::json!(c))
            })?;
            if !json {
                println!("PB&J checkpoint '{checkpoint}' recorded for {session_id}: {status}");
                if status == CheckpointStatus::Fail {
                    println!("Failure logged as a quality issue.");
                }
            }
            Ok(())
        }
        PhaseSubcommand::Stats => stats(&tracker, json),
        PhaseSubcommand::Sessions { all } => sessions(&tracker, all, json),
        PhaseSubcommand::Show { session_id } => show(&tracker, &session_id, json),
        PhaseSubcommand::End {
            session_id,
            outcome,
        } => end(&mut tracker, &session_id, outcome.as_deref(), json),
        PhaseSubcommand::Pause { session_id } => {
            set_status(&mut tracker, &session_id, SessionStatus::Paused, json)
        }
        PhaseSubcommand::Resume { session_id } => {
            set_status(&mut tracker, &session_id, SessionStatus::Active, json)
        }
        PhaseSubcommand::Cleanup { days } => {
            let days = days.unwrap_or(tracker.config().cleanup_after_days);
            let removed = tracker.cleanup_old_sessions(days);
            if json {
                print_json(&serde_json::json!({ "removed": removed, "olderThanDays": days }))?;
            } else {
                println!("Removed {removed} completed session(s) older than {days} day(s).");
            }
            Ok(())
        }
        PhaseSubcommand::Info => info(&tracker, json),
        PhaseSubcommand::Dashboard { port, open } => {
            let port = port.unwrap_or(tracker.config().dashboard_port);
            crate::cmd::dashboard::run(tracker, port, open)
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

fn start(
    tracker: &mut PhaseTracker,
    agent_id: &str,
    phase: Option<&str>,
    context: SessionContext,
    json: bool,
) -> anyhow::Result<()> {
    let session = tracker
        .start_session(agent_id, phase, context)
        .with_context(|| format!("failed to start session for '{agent_id}'"))?;

    if json {
        return print_json(session);
    }
    println!("Session ID: {}", session.session_id);
    let mut fields = vec![
        ("Agent", session.agent_id.clone()),
        ("Phase", session.current_phase.clone()),
    ];
    if let Some(cycle) = &session.work_cycle_id {
        fields.push(("Work cycle", cycle.clone()));
    }
    if let Some(branch) = &session.git_branch {
        fields.push(("Branch", branch.clone()));
    }
    if let Some(issue) = &session.issue_number {
        fields.push(("Issue", issue.clone()));
    }
    print_fields(&fields);
    Ok(())
}

fn transition(
    tracker: &mut PhaseTracker,
    session_id: &str,
    to_phase: &str,
    trigger: &str,
    approved_by: Option<&str>,
    notes: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    tracker
        .transition_phase(session_id, to_phase, trigger, approved_by, notes)
        .with_context(|| format!("failed to transition '{session_id}' to '{to_phase}'"))?;

    if json {
        return report_last(tracker, session_id, json, |s| {
            s.transitions.last().map(|t| serde_json::json!(t))
        });
    }
    let Some(t) = tracker
        .session(session_id)
        .and_then(|s| s.transitions.last())
    else {
        return Ok(());
    };
    println!("Transitioned {session_id}: {} -> {}", t.from_phase, t.to_phase);
    if let Some(approver) = &t.approved_by {
        println!("Approved by: {approver}");
    }
    Ok(())
}

fn end(
    tracker: &mut PhaseTracker,
    session_id: &str,
    outcome: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let result = tracker.end_session(session_id, outcome);
    if result == EndOutcome::NotFound {
        return Err(PhaseError::SessionNotFound(session_id.to_string()).into());
    }

    if json {
        let label = match result {
            EndOutcome::Ended => "ended",
            _ => "already_completed",
        };
        return print_json(&serde_json::json!({ "sessionId": session_id, "result": label }));
    }
    match result {
        EndOutcome::Ended => {
            let minutes = tracker
                .session(session_id)
                .and_then(AgentSession::duration_minutes)
                .unwrap_or(0.0);
            println!("Session {session_id} completed after {minutes:.1} minutes.");
        }
        _ => println!("Session {session_id} was already completed."),
    }
    Ok(())
}

fn set_status(
    tracker: &mut PhaseTracker,
    session_id: &str,
    status: SessionStatus,
    json: bool,
) -> anyhow::Result<()> {
    tracker
        .update_status(session_id, status)
        .with_context(|| format!("failed to set '{session_id}' to {status}"))?;
    if json {
        print_json(&serde_json::json!({ "sessionId": session_id, "status": status }))
    } else {
        println!("Session {session_id} is now {status}.");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn stats(tracker: &PhaseTracker, json: bool) -> anyhow::Result<()> {
    let stats = tracker.dashboard_stats();
    if json {
        return print_json(&stats);
    }

    print_fields(&[
        ("Total sessions", stats.total_sessions.to_string()),
        ("Active sessions", stats.active_sessions.to_string()),
        ("PB&J success rate", format!("{}%", stats.pbj_success_rate)),
        ("Avg session duration", format!("{} min", stats.avg_session_duration)),
    ]);

    if !stats.phase_distribution.is_empty() {
        println!();
        let rows = stats
            .phase_distribution
            .iter()
            .map(|(phase, count)| vec![phase.clone(), count.to_string()])
            .collect();
        print_table(&["PHASE", "ACTIVE"], rows);
    }

    if !stats.recent_decisions.is_empty() {
        println!("\nRecent decisions:");
        for d in stats.recent_decisions.iter().take(5) {
            println!(
                "  {} [{}] {}: {}",
                d.timestamp.format("%Y-%m-%d %H:%M"),
                d.phase,
                d.agent_id,
                truncate(&d.decision, 60)
            );
        }
    }
    Ok(())
}

fn sessions(tracker: &PhaseTracker, all: bool, json: bool) -> anyhow::Result<()> {
    let list = if all {
        tracker.all_sessions()
    } else {
        tracker.active_sessions()
    };
    if json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("No {}sessions.", if all { "" } else { "active " });
        return Ok(());
    }

    let rows = list
        .iter()
        .map(|s| {
            vec![
                s.session_id.clone(),
                s.agent_id.clone(),
                s.current_phase.clone(),
                s.status.to_string(),
                s.start_time.format("%Y-%m-%d %H:%M").to_string(),
                s.decisions.len().to_string(),
                s.transitions.len().to_string(),
                s.pbj_checkpoints.len().to_string(),
            ]
        })
        .collect();
    print_table(
        &["SESSION", "AGENT", "PHASE", "STATUS", "STARTED", "DECISIONS", "TRANSITIONS", "PBJ"],
        rows,
    );
    Ok(())
}

fn show(tracker: &PhaseTracker, session_id: &str, json: bool) -> anyhow::Result<()> {
    let session = tracker
        .session(session_id)
        .ok_or_else(|| PhaseError::SessionNotFound(session_id.to_string()))?;
    if json {
        return print_json(session);
    }

    let mut fields = vec![
        ("Session", session.session_id.clone()),
        ("Agent", session.agent_id.clone()),
        ("Phase", session.current_phase.clone()),
        ("Status", session.status.to_string()),
        ("Started", session.start_time.to_rfc3339()),
    ];
    if let Some(end) = session.end_time {
        fields.push(("Ended", end.to_rfc3339()));
    }
    if let Some(cycle) = &session.work_cycle_id {
        fields.push(("Work cycle", cycle.clone()));
    }
    if let Some(branch) = &session.git_branch {
        fields.push(("Branch", branch.clone()));
    }
    if let Some(issue) = &session.issue_number {
        fields.push(("Issue", issue.clone()));
    }
    print_fields(&fields);

    if !session.transitions.is_empty() {
        println!("\nTransitions:");
        let rows = session
            .transitions
            .iter()
            .map(|t| {
                vec![
                    t.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{} -> {}", t.from_phase, t.to_phase),
                    t.approved_by.clone().unwrap_or_else(|| "-".into()),
                    truncate(&t.trigger, 40),
                ]
            })
            .collect();
        print_table(&["WHEN", "MOVE", "APPROVED BY", "TRIGGER"], rows);
    }

    println!("\nDecisions:");
    let rows = session
        .decisions
        .iter()
        .map(|d| {
            vec![
                d.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                d.phase.clone(),
                truncate(&d.decision, 50),
                d.tags.join(","),
            ]
        })
        .collect();
    print_table(&["WHEN", "PHASE", "DECISION", "TAGS"], rows);

    if !session.pbj_checkpoints.is_empty() {
        println!("\nPB&J checkpoints:");
        let rows = session
            .pbj_checkpoints
            .iter()
            .map(|c| {
                vec![
                    c.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    c.phase.clone(),
                    truncate(&c.checkpoint, 40),
                    c.status.to_string(),
                ]
            })
            .collect();
        print_table(&["WHEN", "PHASE", "CHECKPOINT", "STATUS"], rows);
    }
    Ok(())
}

fn info(tracker: &PhaseTracker, json: bool) -> anyhow::Result<()> {
    let graph = tracker.phase_graph();
    if json {
        let config = tracker.config();
        return print_json(&serde_json::json!({
            "name": graph.name,
            "phases": graph.phases,
            "requireApprovalForTransitions": config.require_approval_for_transitions,
            "pbjCheckpointFrequencyMinutes": config.pbj_checkpoint_frequency_minutes,
            "sessionTimeoutMinutes": config.session_timeout_minutes,
        }));
    }

    println!("Phase graph: {}", graph.name);
    for phase in &graph.phases {
        println!("\n{} ({})", phase.name, phase.id);
        if !phase.description.is_empty() {
            println!("  {}", phase.description);
        }
        for objective in &phase.objectives {
            println!("  - {objective}");
        }
        let next = if phase.next_phases.is_empty() {
            "(none)".to_string()
        } else {
            phase.next_phases.join(", ")
        };
        println!("  next: {next}");
    }
    let approval = if tracker.config().require_approval_for_transitions {
        "required (--approved-by)"
    } else {
        "not required"
    };
    println!("\nTransition approval: {approval}");

    let config = tracker.config();
    print_fields(&[
        (
            "PB&J checkpoint every",
            format!("{} min", config.pbj_checkpoint_frequency_minutes),
        ),
        ("Session timeout", format!("{} min", config.session_timeout_minutes)),
    ]);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// In JSON mode, print the newest entry of one of a session's event logs.
fn report_last(
    tracker: &PhaseTracker,
    session_id: &str,
    json: bool,
    pick: impl Fn(&AgentSession) -> Option<serde_json::Value>,
) -> anyhow::Result<()> {
    if !json {
        return Ok(());
    }
    match tracker.session(session_id).and_then(pick) {
        Some(value) => print_json(&value),
        None => Ok(()),
    }
}

fn parse_context(raw: Option<&str>) -> anyhow::Result<SessionContext> {
    let Some(raw) = raw else {
        return Ok(SessionContext::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw).context("--context is not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("--context must be a JSON object, got {other}"),
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
