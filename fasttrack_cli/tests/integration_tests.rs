//! Integration tests for the fasttrack binary.
//!
//! These tests verify end-to-end behavior including:
//! - The start/stop fasting lifecycle
//! - History listing and CSV export
//! - Calorie logging and validation
//! - Data persistence across runs

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
///
/// The config directory and home point at an empty scratch directory so a
/// developer's own `fasttrack/config.toml` never leaks into a test.
fn cli() -> Command {
    let isolated = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fasttrack-no-config");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fasttrack"));
    cmd.env("XDG_CONFIG_HOME", &isolated).env("HOME", &isolated);
    cmd
}

/// Run a subcommand against `data_dir`
fn run(data_dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    cli().args(args).arg("--data-dir").arg(data_dir).assert()
}

/// Read the raw key-value store document
fn read_store(data_dir: &Path) -> BTreeMap<String, String> {
    let contents = fs::read_to_string(data_dir.join("store.json")).expect("Failed to read store");
    serde_json::from_str(&contents).expect("Store is not a string map")
}

fn fasting_history(data_dir: &Path) -> Vec<Value> {
    let store = read_store(data_dir);
    let raw = store.get("fastingHistory").expect("No fasting history");
    serde_json::from_str(raw).expect("History is not JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Intermittent fasting, weight and calorie tracker",
        ));
}

#[test]
fn test_status_when_idle() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Not fasting"));
}

#[test]
fn test_start_persists_fast() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["start"])
        .success()
        .stdout(predicate::str::contains("Fasting started"))
        .stdout(predicate::str::contains("Digesting & Storing"));

    let store = read_store(data_dir);
    assert_eq!(store.get("isFasting").map(String::as_str), Some("true"));
    let start: i64 = store
        .get("fastingStartTime")
        .expect("No start time")
        .parse()
        .expect("Start time is not a number");

    let history = fasting_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["startTime"].as_i64(), Some(start));
    assert!(history[0].get("endTime").is_none());
    assert!(history[0].get("duration").is_none());
}

#[test]
fn test_start_twice_changes_nothing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["start"]).success();
    let before = read_store(data_dir);

    run(data_dir, &["start"])
        .success()
        .stdout(predicate::str::contains("Already fasting"));

    assert_eq!(read_store(data_dir), before);
}

#[test]
fn test_stop_completes_fast() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["start"]).success();
    run(data_dir, &["stop"])
        .success()
        .stdout(predicate::str::contains("Fasting completed!"))
        .stdout(predicate::str::contains("You fasted for"));

    let store = read_store(data_dir);
    assert_eq!(store.get("isFasting").map(String::as_str), Some("false"));
    assert!(!store.contains_key("fastingStartTime"));

    let history = fasting_history(data_dir);
    assert_eq!(history.len(), 1);
    let start = history[0]["startTime"].as_i64().unwrap();
    let end = history[0]["endTime"].as_i64().unwrap();
    let duration = history[0]["duration"].as_u64().unwrap();
    assert!(end >= start);
    assert_eq!(duration, ((end - start) / 1000) as u64);
}

#[test]
fn test_stop_while_idle_changes_nothing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["stop"])
        .success()
        .stdout(predicate::str::contains("Not fasting"));

    assert!(!data_dir.join("store.json").exists());
}

#[test]
fn test_fast_survives_restart() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["start"]).success();
    let start = read_store(data_dir)["fastingStartTime"].clone();

    run(data_dir, &["status"])
        .success()
        .stdout(predicate::str::contains("FASTING"))
        .stdout(predicate::str::contains("of 16h"));

    assert_eq!(read_store(data_dir)["fastingStartTime"], start);
}

#[test]
fn test_history_lists_sessions() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["history"])
        .success()
        .stdout(predicate::str::contains("No fasting sessions recorded yet"));

    run(data_dir, &["start"]).success();
    run(data_dir, &["stop"]).success();
    run(data_dir, &["start"]).success();

    let output = run(data_dir, &["history"])
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);

    // Most recent first
    let in_progress = stdout.find("In Progress").expect("missing in-progress fast");
    let completed = stdout.find("00:00:").expect("missing completed fast");
    assert!(in_progress < completed);
}

#[test]
fn test_export_writes_completed_fasts() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let csv_path = data_dir.join("export").join("fasts.csv");

    run(data_dir, &["start"]).success();
    run(data_dir, &["stop"]).success();
    run(data_dir, &["start"]).success();

    cli()
        .arg("export")
        .arg(&csv_path)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 fasts"));

    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert!(csv_content.starts_with("date,started_at,ended_at,duration_seconds,duration"));
    assert_eq!(csv_content.lines().count(), 2);
}

#[test]
fn test_watch_stops_after_ticks() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["watch", "--ticks", "1"])
        .success()
        .stdout(predicate::str::contains("Not fasting"));

    run(data_dir, &["start"]).success();
    run(data_dir, &["watch", "--ticks", "1"])
        .success()
        .stdout(predicate::str::contains("Digesting & Storing"));
}

#[test]
fn test_calories_add_and_show() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["calories", "target", "1800"])
        .success()
        .stdout(predicate::str::contains("1800 calories"));
    run(data_dir, &["calories", "add", "2000"])
        .success()
        .stdout(predicate::str::contains("2000 calories recorded"));

    run(data_dir, &["calories"])
        .success()
        .stdout(predicate::str::contains("Target:  1800"))
        .stdout(predicate::str::contains("200 over"));

    // Same day replaces the entry
    run(data_dir, &["calories", "add", "1700"]).success();
    let store = read_store(data_dir);
    let entries: Vec<Value> = serde_json::from_str(&store["calorieHistory"]).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["calories"].as_u64(), Some(1700));
    assert_eq!(entries[0]["change"].as_i64(), Some(-100));
}

#[test]
fn test_invalid_calories_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    for amount in ["abc", "0", "-5"] {
        run(data_dir, &["calories", "add", amount])
            .failure()
            .stderr(predicate::str::contains("valid calorie amount"));
    }
    run(data_dir, &["calories", "target", "20000"])
        .failure()
        .stderr(predicate::str::contains("Calorie target"));

    assert!(!data_dir.join("store.json").exists());
}

#[test]
fn test_weight_without_data() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["weight"])
        .success()
        .stdout(predicate::str::contains("No weight data yet"));

    // Sync without a token fails and leaves nothing behind
    run(data_dir, &["weight", "sync"])
        .failure()
        .stderr(predicate::str::contains("not connected to Fitbit"));
    assert!(!data_dir.join("store.json").exists());
}

#[test]
fn test_weight_callback_denied() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(
        data_dir,
        &[
            "weight",
            "callback",
            "--url",
            "http://localhost:8080/fitbit-callback?error=access_denied",
        ],
    )
    .failure()
    .stderr(predicate::str::contains("access_denied"));
    assert!(!data_dir.join("store.json").exists());
}

#[test]
fn test_weight_callback_code_needs_broker() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    run(data_dir, &["weight", "callback", "--code", "abc123"])
        .failure()
        .stderr(predicate::str::contains("token_broker_url"));
    assert!(!data_dir.join("store.json").exists());
}

#[test]
fn test_weight_callback_requires_code_or_url() {
    let temp_dir = setup_test_dir();

    run(temp_dir.path(), &["weight", "callback"]).failure();
    run(
        temp_dir.path(),
        &["weight", "callback", "--code", "abc", "--url", "http://localhost/?code=abc"],
    )
    .failure();
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_file_sets_goal() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let config_home = temp_dir.path().join("config");
    fs::create_dir_all(config_home.join("fasttrack")).unwrap();
    fs::write(
        config_home.join("fasttrack").join("config.toml"),
        "[fasting]\ngoal_hours = 18\n",
    )
    .unwrap();

    cli()
        .env("XDG_CONFIG_HOME", &config_home)
        .args(["start", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success();

    cli()
        .env("XDG_CONFIG_HOME", &config_home)
        .args(["status", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("of 18h"));
}
