//! E2E tests for `stride summary` and `stride habit`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn stride_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stride"));
    cmd.current_dir(dir);
    cmd.env("STRIDE_LOG", "error");
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("STRIDE_CYCLE_POLICY");
    cmd
}

fn stride_human_cmd(dir: &Path) -> Command {
    let mut cmd = stride_cmd(dir);
    cmd.env("FORMAT", "pretty");
    cmd
}

fn write_snapshot(dir: &Path) -> PathBuf {
    let snapshot = json!({
        "habits": [{"id": "h1"}, {"id": "h2"}],
        "events": [
            {"habit_id": "h1", "event_date": "2024-01-03"},
            {"habit_id": "h1", "event_date": "2024-01-04T08:00:00Z"},
            {"habit_id": "h1", "event_date": "2024-01-05"},
            {"habit_id": "h2", "event_date": "2024-01-01"},
            {"habit_id": "h2", "event_date": "nope"}
        ],
        "tasks": [
            {"id": "a", "completed": true, "goal_id": "g1"},
            {"id": "b", "completed": false, "goal_id": "g1"},
            {"id": "c", "completed": false}
        ],
        "edges": [
            {"blocking_task_id": "a", "dependent_task_id": "c"},
            {"blocking_task_id": "b", "dependent_task_id": "c"}
        ],
        "goals": [{"id": "g1", "status": "in_progress"}, {"id": "g2", "status": "completed"}]
    });
    let path = dir.join("snapshot.json");
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot).expect("serialize"))
        .expect("write snapshot");
    path
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

#[test]
fn summary_json_reports_streaks_tasks_and_goals() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let json = json_output(stride_cmd(dir.path()).args([
        "summary",
        "--snapshot",
        snapshot.to_str().expect("utf8 path"),
        "--as-of",
        "2024-01-05",
        "--json",
    ]));

    assert_eq!(json["as_of"], "2024-01-05");
    assert_eq!(json["habits"]["h1"]["current_streak"], 3);
    assert_eq!(json["habits"]["h1"]["longest_streak"], 3);
    assert_eq!(json["habits"]["h2"]["current_streak"], 0);
    assert_eq!(json["habits"]["h2"]["total_completions"], 1);

    assert_eq!(json["tasks"]["c"]["is_blocked"], true);
    assert_eq!(json["tasks"]["c"]["blockers"], json!(["b"]));
    assert_eq!(json["ready_tasks"], json!(["b"]));

    assert_eq!(json["goals"]["g1"]["done"], 1);
    assert_eq!(json["goals"]["g1"]["total"], 2);
    assert_eq!(json["analytics"]["goals_completed"], 1);
    assert_eq!(json["analytics"]["tasks_completed"], 1);
    assert_eq!(json["analytics"]["habits_tracked_today"], 1);

    let rejected = json["rejected"].as_array().expect("rejected array");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["kind"], "completion_event");
    assert_eq!(rejected[0]["index"], 4);
    assert_eq!(rejected[0]["reason"], "invalid_date");
}

#[test]
fn summary_pretty_output_has_sections() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    stride_human_cmd(dir.path())
        .args(["summary", "-s"])
        .arg(&snapshot)
        .args(["--as-of", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary as of 2024-01-05"))
        .stdout(predicate::str::contains("Habits"))
        .stdout(predicate::str::contains("blocked by b"))
        .stdout(predicate::str::contains("1/2 (50%)"))
        .stdout(predicate::str::contains("Rejected records"));
}

#[test]
fn summary_reports_dangling_edge_with_code() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = dir.path().join("dangling.json");
    let body = json!({
        "tasks": [{"id": "c", "completed": false}],
        "edges": [{"blocking_task_id": "gone", "dependent_task_id": "c"}]
    });
    std::fs::write(&snapshot, body.to_string()).expect("write snapshot");

    let json = json_output(
        stride_cmd(dir.path())
            .args(["summary", "-s"])
            .arg(&snapshot)
            .args(["--as-of", "2024-01-05", "--json"]),
    );
    assert_eq!(json["warnings"][0]["code"], "E3101");
    assert_eq!(json["warnings"][0]["kind"], "dangling_edge");
    assert_eq!(json["tasks"]["c"]["is_blocked"], false);

    stride_human_cmd(dir.path())
        .args(["summary", "-s"])
        .arg(&snapshot)
        .args(["--as-of", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[E3101] dangling edge gone → c"));
}

#[test]
fn summary_missing_snapshot_fails() {
    let dir = TempDir::new().expect("tempdir");

    stride_cmd(dir.path())
        .args(["summary", "-s", "does-not-exist.json", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn habit_add_extends_streak() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let json = json_output(
        stride_cmd(dir.path())
            .args(["habit", "h1", "-s"])
            .arg(&snapshot)
            .args(["--add", "2024-01-06", "--as-of", "2024-01-06", "--json"]),
    );

    assert_eq!(json["habit"], "h1");
    assert_eq!(json["mutation"], json!({"op": "add", "date": "2024-01-06"}));
    assert_eq!(json["current_streak"], 4);
    assert_eq!(json["longest_streak"], 4);
    assert_eq!(json["total_completions"], 4);
    assert_eq!(json["last_completed"], "2024-01-06");
}

#[test]
fn habit_remove_breaks_streak() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let json = json_output(
        stride_cmd(dir.path())
            .args(["habit", "h1", "-s"])
            .arg(&snapshot)
            .args(["--remove", "2024-01-04", "--as-of", "2024-01-05", "--json"]),
    );

    assert_eq!(json["current_streak"], 1);
    assert_eq!(json["longest_streak"], 1);
    assert_eq!(json["total_completions"], 2);
}

#[test]
fn habit_without_mutation_is_plain_summary() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path());

    let json = json_output(
        stride_cmd(dir.path())
            .args(["habit", "h1", "-s"])
            .arg(&snapshot)
            .args(["--as-of", "2024-01-07", "--json"]),
    );

    assert!(json.get("mutation").is_none());
    assert_eq!(json["current_streak"], 0);
    assert_eq!(json["longest_streak"], 3);
}
