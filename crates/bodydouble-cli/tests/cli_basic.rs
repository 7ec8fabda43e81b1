//! Basic CLI E2E tests.
//!
//! Each test points the binary at its own temporary data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against `dir` and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_bodydouble"))
        .args(args)
        .env("BODYDOUBLE_DIR", dir)
        .env_remove("POMODORO_WORK_MINUTES")
        .env_remove("POMODORO_BREAK_MINUTES")
        .env("BODYDOUBLE_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn session_json(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&run_ok(dir, &["session", "show", "--json"])).unwrap()
}

#[test]
fn test_ack_writes_mailbox_file() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["ack", "  continue:Writing \n"]);
    let content = std::fs::read_to_string(dir.path().join("acknowledged.txt")).unwrap();
    assert_eq!(content, "continue:Writing");
}

#[test]
fn test_ack_rejects_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["ack", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_task_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["task", "add", "Writing"]);
    run_ok(dir.path(), &["task", "add", "Guitar", "--fun"]);

    let list = run_ok(dir.path(), &["task", "list"]);
    assert!(list.contains("work  Writing"));
    assert!(list.contains("fun   Guitar"));

    let log = std::fs::read_to_string(dir.path().join("log.yaml")).unwrap();
    assert!(log.contains("Writing"));
    assert!(log.contains("Guitar"));
}

#[test]
fn test_task_add_conflicting_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["task", "add", "Writing"]);
    let (_, stderr, code) = run_cli(dir.path(), &["task", "add", "Writing", "--fun"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already a work task"));
}

#[test]
fn test_session_steering_fields() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["task", "add", "Writing"]);
    run_ok(dir.path(), &["session", "override", "0"]);
    run_ok(dir.path(), &["session", "extend", "5"]);
    run_ok(dir.path(), &["session", "switch", "Writing"]);
    run_ok(dir.path(), &["session", "plan", "--work", "50", "--break", "10"]);
    run_ok(dir.path(), &["session", "meeting", "Standup", "2030-01-07T10:00"]);
    run_ok(dir.path(), &["session", "complete", "Vitamins"]);

    let session = session_json(dir.path());
    assert_eq!(session["timer_override_minutes"], 0.0);
    assert_eq!(session["extend_minutes"], 5.0);
    assert_eq!(session["task_switch"], "Writing");
    assert_eq!(session["next_work_minutes"], 50.0);
    assert_eq!(session["next_break_minutes"], 10.0);
    assert_eq!(session["meetings"][0]["name"], "Standup");
    assert_eq!(session["meetings"][0]["start_time"], "2030-01-07T10:00:00");
    assert_eq!(session["completed_items"][0], "Vitamins");
}

#[test]
fn test_session_switch_unknown_task_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["session", "switch", "Knitting"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown task: Knitting"));
}

#[test]
fn test_queue_roundtrip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let queue = r#"[
      {"id": 1, "timestamp": "2026-03-02T09:25:00", "type": "work_complete", "prompt": "Stretch!", "delivered": false},
      {"id": 2, "timestamp": "2026-03-02T09:26:00", "type": "error", "prompt": "Bad ack", "delivered": false}
    ]"#;
    std::fs::write(dir.path().join("prompt_queue.json"), queue).unwrap();

    assert_eq!(run_ok(dir.path(), &["queue", "next"]).trim(), "Stretch!");

    let pending: serde_json::Value =
        serde_json::from_str(&run_ok(dir.path(), &["queue", "list", "--pending", "--json"])).unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["id"], 2);

    run_ok(dir.path(), &["queue", "deliver", "2"]);
    assert_eq!(run_ok(dir.path(), &["queue", "next"]).trim(), "");

    let (_, _, code) = run_cli(dir.path(), &["queue", "deliver", "99"]);
    assert_eq!(code, 1);

    run_ok(dir.path(), &["queue", "clear"]);
    assert!(run_ok(dir.path(), &["queue", "list"]).contains("queue is empty"));
}

#[test]
fn test_session_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["session", "extend", "5"]);
    run_ok(dir.path(), &["session", "reset"]);
    let session = session_json(dir.path());
    assert!(session["extend_minutes"].is_null());
    assert_eq!(session["work_sessions_completed"], 0);
}

#[test]
fn test_chore_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["chore", "add", "Laundry", "0"]);
    let list = run_ok(dir.path(), &["chore", "list"]);
    assert!(list.contains("due Laundry"));
}

#[test]
fn test_config_get_set_list_reset() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "timer.work_minutes"]).trim(), "25.0");

    run_ok(dir.path(), &["config", "set", "timer.work_minutes", "50"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "timer.work_minutes"]).trim(), "50.0");

    let list: serde_json::Value =
        serde_json::from_str(&run_ok(dir.path(), &["config", "list"])).unwrap();
    assert_eq!(list["meetings"]["warning_thresholds"][0], 60);

    run_ok(dir.path(), &["config", "reset"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "timer.work_minutes"]).trim(), "25.0");

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
}
