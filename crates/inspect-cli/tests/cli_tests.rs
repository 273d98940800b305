use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn inspect_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("inspect-cache"))
}

const SCENARIO: &str = r#"{
    "objects": [{ "id": 1, "type": "mesh" }, { "id": 2, "type": "material" }],
    "steps": [
        { "op": "request", "handle": "a", "targets": [1] },
        { "op": "previews", "handle": "a" },
        { "op": "release", "handle": "a" },
        { "op": "request", "handle": "a", "targets": [1] },
        { "op": "request", "handle": "b", "targets": [2] },
        { "op": "reload", "destroy": [2] },
        { "op": "tick" }
    ]
}"#;

fn write_scenario(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("scenario.json");
    fs::write(&path, json).unwrap();
    path
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_init_writes_default_config() {
    let temp_dir = TempDir::new().unwrap();

    inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect-cache.json"));

    let config = fs::read_to_string(temp_dir.path().join("inspect-cache.json")).unwrap();
    assert!(config.contains("cacheOptions"));
    assert!(config.contains("identityBase"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("inspect-cache.json"), "{}").unwrap();

    inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let scenario = write_scenario(&temp_dir, SCENARIO);
    let config = temp_dir.path().join("bad.json");
    fs::write(&config, r#"{ "cacheOptions": { "identityBase": 64 } }"#).unwrap();

    inspect_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("identityBase must be odd"));
}

// ============================================================================
// REPLAY
// ============================================================================

#[test]
fn test_missing_scenario_fails() {
    let temp_dir = TempDir::new().unwrap();

    inspect_cmd()
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No scenario specified"));
}

#[test]
fn test_replay_prints_summary() {
    let temp_dir = TempDir::new().unwrap();
    let scenario = write_scenario(&temp_dir, SCENARIO);

    inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("Replayed 7 step(s) over 1 tick(s)"))
        .stdout(predicate::str::contains("bindings cached:      1"))
        .stdout(predicate::str::contains("dropped after reload: 1"));
}

#[test]
fn test_replay_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let scenario = write_scenario(&temp_dir, SCENARIO);

    let output = inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--scenario")
        .arg(&scenario)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["steps"], 7);
    assert_eq!(summary["bindings"], 1);
    assert_eq!(summary["previewsListed"], 2);
    assert_eq!(summary["stats"]["hits"], 1);
    assert_eq!(summary["stats"]["droppedAfterReload"], 1);
}

#[test]
fn test_disabled_provider_flag() {
    let temp_dir = TempDir::new().unwrap();
    let scenario = write_scenario(&temp_dir, SCENARIO);

    let output = inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--scenario")
        .arg(&scenario)
        .arg("--json")
        .arg("--disable-provider")
        .arg("wireframe")
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["previewsListed"], 1);
    assert_eq!(summary["previews"], 0);
}

#[test]
fn test_bad_step_reports_its_position() {
    let temp_dir = TempDir::new().unwrap();
    let scenario = write_scenario(
        &temp_dir,
        r#"{ "steps": [{ "op": "tick" }, { "op": "kill", "target": 5 }] }"#,
    );

    inspect_cmd()
        .current_dir(&temp_dir)
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Step 2 failed"));
}
