#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn aisop(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aisop").unwrap();
    cmd.current_dir(dir.path()).env("AISOP_ROOT", dir.path());
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

/// Start a session and return its id.
fn start(dir: &TempDir, agent: &str, extra: &[&str]) -> String {
    let json = json_output(aisop(dir).args(["phase", "start", agent]).args(extra));
    json["sessionId"].as_str().unwrap().to_string()
}

fn session_file(dir: &TempDir, session_id: &str) -> serde_json::Value {
    let path = dir
        .path()
        .join(".ai-sop/phase-tracking")
        .join(format!("session-{session_id}.json"));
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// start
// ---------------------------------------------------------------------------

#[test]
fn start_prints_session_id_and_writes_file() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args([
            "phase", "start", "agent-1", "--branch", "feature/pay", "--issue", "43",
            "--work-cycle", "payments",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session ID: agent-1-"))
        .stdout(predicate::str::contains("discovery"));

    let files: Vec<_> = std::fs::read_dir(dir.path().join(".ai-sop/phase-tracking"))
        .unwrap()
        .collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn start_records_metadata() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &["--phase", "build", "--branch", "feature/pay", "--issue", "43"]);
    let file = session_file(&dir, &id);
    assert_eq!(file["currentPhase"], "build");
    assert_eq!(file["gitBranch"], "feature/pay");
    assert_eq!(file["issueNumber"], "43");
    assert_eq!(file["status"], "active");
    assert_eq!(file["decisions"][0]["decision"], "Session started");
}

#[test]
fn start_with_dev_cycle_uses_development_graph() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &["--dev-cycle"]);
    aisop(&dir)
        .args(["phase", "transition", &id, "planning", "--approved-by", "lead", "--dev-cycle"])
        .assert()
        .success();
    assert_eq!(session_file(&dir, &id)["currentPhase"], "planning");
}

// ---------------------------------------------------------------------------
// transition
// ---------------------------------------------------------------------------

#[test]
fn transition_requires_approval() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "transition", &id, "build", "--trigger", "reqs done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires approval"));
    assert_eq!(session_file(&dir, &id)["currentPhase"], "discovery");
}

#[test]
fn transition_with_approval_succeeds() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args([
            "phase", "transition", &id, "build", "--trigger", "reqs done", "--approved-by", "lead",
            "--notes", "looks good",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("discovery -> build"));

    let file = session_file(&dir, &id);
    assert_eq!(file["currentPhase"], "build");
    assert_eq!(file["transitions"][0]["approvedBy"], "lead");
    assert_eq!(file["transitions"][0]["notes"], "looks good");
}

#[test]
fn transition_off_graph_is_rejected() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "transition", &id, "feedback", "--approved-by", "lead"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid phase transition"));
    assert!(session_file(&dir, &id)["transitions"].as_array().unwrap().is_empty());
}

#[test]
fn transition_unknown_session_fails() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args(["phase", "transition", "ghost-1", "build", "--approved-by", "lead"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session not found"));
}

// ---------------------------------------------------------------------------
// decision / pbj
// ---------------------------------------------------------------------------

#[test]
fn decision_with_context_and_tags() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args([
            "phase", "decision", &id, "Use axum", "--reasoning", "fits the stack",
            "--context", r#"{"confidence": 0.9}"#, "--tags", "arch, web",
        ])
        .assert()
        .success();

    let d = &session_file(&dir, &id)["decisions"][1];
    assert_eq!(d["decision"], "Use axum");
    assert_eq!(d["context"]["confidence"], 0.9);
    assert_eq!(d["tags"], serde_json::json!(["arch", "web"]));
}

#[test]
fn decision_rejects_bad_context() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "decision", &id, "x", "--context", "{oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--context"));
}

#[test]
fn failing_pbj_checkpoint_logs_quality_issue() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &["--phase", "build"]);
    aisop(&dir)
        .args([
            "phase", "pbj", &id, "integration tests", "--status", "fail", "--details", "db timeout",
            "--actions", "raise pool,retry",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("quality issue"));

    let file = session_file(&dir, &id);
    assert_eq!(file["pbjCheckpoints"][0]["status"], "fail");
    assert_eq!(
        file["pbjCheckpoints"][0]["improvementActions"],
        serde_json::json!(["raise pool", "retry"])
    );
    let last = file["decisions"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["tags"], serde_json::json!(["pbj-failure", "quality-issue"]));
}

#[test]
fn pbj_rejects_unknown_status() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "pbj", &id, "tests", "--status", "maybe"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// stats / sessions / show
// ---------------------------------------------------------------------------

#[test]
fn stats_json_reflects_checkpoints() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &["--phase", "build"]);
    for status in ["pass", "pass", "fail"] {
        aisop(&dir)
            .args(["phase", "pbj", &id, "check", "--status", status])
            .assert()
            .success();
    }
    let stats = json_output(aisop(&dir).args(["phase", "stats"]));
    assert_eq!(stats["totalSessions"], 1);
    assert_eq!(stats["activeSessions"], 1);
    assert_eq!(stats["phaseDistribution"]["build"], 1);
    assert!((stats["pbjSuccessRate"].as_f64().unwrap() - 66.7).abs() < 0.05);
}

#[test]
fn stats_text_on_empty_project() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args(["phase", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total sessions"))
        .stdout(predicate::str::contains("100%"));
}

#[test]
fn sessions_hides_completed_unless_all() {
    let dir = TempDir::new().unwrap();
    let a = start(&dir, "alpha", &[]);
    let b = start(&dir, "beta", &[]);
    aisop(&dir).args(["phase", "end", &a]).assert().success();

    let active = json_output(aisop(&dir).args(["phase", "sessions"]));
    let ids: Vec<&str> = active
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sessionId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [b.as_str()]);

    let all = json_output(aisop(&dir).args(["phase", "sessions", "--all"]));
    assert_eq!(all.as_array().unwrap().len(), 2);

    aisop(&dir)
        .args(["phase", "sessions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beta"))
        .stdout(predicate::str::contains("alpha").not());
}

#[test]
fn show_prints_session_detail() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session started"));
    aisop(&dir)
        .args(["phase", "show", "ghost-1"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// end / pause / resume / cleanup
// ---------------------------------------------------------------------------

#[test]
fn end_completes_once() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "end", &id, "--outcome", "shipped"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));
    let file = session_file(&dir, &id);
    assert_eq!(file["status"], "completed");
    assert!(file["endTime"].is_string());

    aisop(&dir)
        .args(["phase", "end", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("already completed"));
    assert_eq!(session_file(&dir, &id)["endTime"], file["endTime"]);
}

#[test]
fn end_unknown_session_fails() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args(["phase", "end", "ghost-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session not found"));
}

#[test]
fn pause_and_resume() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir).args(["phase", "pause", &id]).assert().success();
    assert_eq!(session_file(&dir, &id)["status"], "paused");
    aisop(&dir).args(["phase", "resume", &id]).assert().success();
    assert_eq!(session_file(&dir, &id)["status"], "active");

    aisop(&dir).args(["phase", "end", &id]).assert().success();
    aisop(&dir)
        .args(["phase", "resume", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already completed"));
}

#[test]
fn cleanup_keeps_recent_sessions() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir).args(["phase", "end", &id]).assert().success();
    let out = json_output(aisop(&dir).args(["phase", "cleanup", "--days", "30"]));
    assert_eq!(out["removed"], 0);
    assert_eq!(session_file(&dir, &id)["status"], "completed");
}

// ---------------------------------------------------------------------------
// info / errors
// ---------------------------------------------------------------------------

#[test]
fn info_lists_constitution_phases() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args(["phase", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("constitution"))
        .stdout(predicate::str::contains("discovery"))
        .stdout(predicate::str::contains("feedback"));
}

#[test]
fn info_dev_cycle_lists_development_phases() {
    let dir = TempDir::new().unwrap();
    let graph = json_output(aisop(&dir).args(["phase", "info", "--dev-cycle"]));
    assert_eq!(graph["name"], "development");
    assert_eq!(graph["phases"][1]["id"], "planning");
}

#[test]
fn info_shows_checkpoint_cadence_and_timeout() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
    std::fs::write(
        dir.path().join(".ai-sop/config.yaml"),
        "pbj_checkpoint_frequency_minutes: 15\nsession_timeout_minutes: 90\n",
    )
    .unwrap();
    aisop(&dir)
        .args(["phase", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("15 min"))
        .stdout(predicate::str::contains("90 min"));

    let info = json_output(aisop(&dir).args(["phase", "info"]));
    assert_eq!(info["pbjCheckpointFrequencyMinutes"], 15);
    assert_eq!(info["sessionTimeoutMinutes"], 90);
}

#[test]
fn dev_cycle_help_explains_it_is_per_invocation() {
    let dir = TempDir::new().unwrap();
    aisop(&dir)
        .args(["phase", "transition", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not stored with sessions"))
        .stdout(predicate::str::contains("graph: development"));
}

#[test]
fn dev_cycle_session_needs_flag_or_config_on_later_commands() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &["--dev-cycle"]);
    aisop(&dir)
        .args(["phase", "transition", &id, "planning", "--approved-by", "lead"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid phase transition"));

    std::fs::write(dir.path().join(".ai-sop/config.yaml"), "graph: development\n").unwrap();
    aisop(&dir)
        .args(["phase", "transition", &id, "planning", "--approved-by", "lead"])
        .assert()
        .success();
}

#[test]
fn huge_cleanup_age_is_not_a_crash() {
    let dir = TempDir::new().unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir).args(["phase", "end", &id]).assert().success();
    let out = json_output(aisop(&dir).args(["phase", "cleanup", "--days", "4294967295"]));
    assert_eq!(out["removed"], 0);
}

#[test]
fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
    std::fs::write(dir.path().join(".ai-sop/config.yaml"), "graph: [unclosed").unwrap();
    aisop(&dir)
        .args(["phase", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn approval_can_be_disabled_in_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".ai-sop")).unwrap();
    std::fs::write(
        dir.path().join(".ai-sop/config.yaml"),
        "require_approval_for_transitions: false\n",
    )
    .unwrap();
    let id = start(&dir, "agent-1", &[]);
    aisop(&dir)
        .args(["phase", "transition", &id, "build"])
        .assert()
        .success();
}
