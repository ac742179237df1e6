//! Integration tests for the `lumen` CLI binary.
//!
//! Argument parsing, help output, completions, config handling and error
//! exit codes run without a backend; a handful of end-to-end checks run
//! against a wiremock backend.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `lumen` binary with env isolation.
///
/// Clears all `LUMEN_*` env vars and points config directories at `home`
/// so tests never touch the user's real configuration.
fn lumen_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("lumen");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("LUMEN_PROFILE")
        .env_remove("LUMEN_SERVER")
        .env_remove("LUMEN_TIMEOUT_MS")
        .env_remove("LUMEN_RETRIES")
        .env_remove("LUMEN_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn aliased_document() -> serde_json::Value {
    json!({"zone": [{
        "zone_id": 1,
        "zone_name": "House",
        "group": [{
            "group_id": 1,
            "group_name": "Ground floor",
            "locations": [
                {"location_id": 1, "location_name": "Kitchen",
                 "devices": [{"device_id": 1, "device_name": "Counter", "device_ip": "192.168.1.20"}]},
                {"location_id": 2, "location_name": "Unused", "device": []}
            ]
        }]
    }]})
}

/// Run a prepared command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("lighting")
            .and(predicate::str::contains("zones"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("discover")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lumen"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_brightness_out_of_range_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["devices", "brightness", "7", "300"])
        .assert()
        .code(2);
}

#[test]
fn test_move_needs_a_destination() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["devices", "move", "-z", "1", "-g", "1", "-l", "1", "2"])
        .assert()
        .code(2);
}

#[test]
fn test_discover_commit_needs_a_group() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["discover", "192.168.1", "--all", "--commit"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_backend_command_without_config() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_cmd(home.path())
        .args(["zones", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No backend configured"), "{text}");
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_cmd(home.path())
        .args(["--profile", "attic", "zones", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("attic"));
}

#[test]
fn test_set_server_then_show() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["config", "set-server", "http://192.168.1.10:5000"])
        .assert()
        .success();

    lumen_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.default]")
                .and(predicate::str::contains("http://192.168.1.10:5000")),
        );
}

#[test]
fn test_set_server_rejects_bad_urls() {
    let home = tempfile::tempdir().unwrap();
    lumen_cmd(home.path())
        .args(["config", "set-server", "ftp://lumen.local"])
        .assert()
        .code(2);
}

// ── Offline normalization ───────────────────────────────────────────

#[test]
fn test_normalize_file_folds_aliases() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("hierarchy.json");
    std::fs::write(&file, aliased_document().to_string()).unwrap();

    let output = lumen_cmd(home.path())
        .args(["hierarchy", "normalize"])
        .arg(&file)
        .args(["-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let location = &doc["zones"][0]["groups"][0]["location"];
    assert_eq!(location.as_array().unwrap().len(), 1);
    assert_eq!(location[0]["device"][0]["device_name"], "Counter");
    assert!(doc.get("zone").is_none());
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_zones_list_reads_backend_hierarchy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hierarchy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(aliased_document()))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = lumen_cmd(home.path());
    cmd.args(["--server", &server.uri(), "zones", "list", "-o", "json"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let zones: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(zones[0]["zone_name"], "House");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hierarchy_show_plain_lists_device_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hierarchy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(aliased_document()))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = lumen_cmd(home.path());
    cmd.args(["--server", &server.uri(), "hierarchy", "show", "-o", "plain"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1/1/1/1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_power_on_reports_new_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/7/power"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/devices/7/apply_saved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = lumen_cmd(home.path());
    cmd.args(["--server", &server.uri(), "devices", "power", "7", "on", "-o", "plain"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "on");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_control_call_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/9/effect"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"status": "error", "message": "Device not found"})),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = lumen_cmd(home.path());
    cmd.args(["--server", &server.uri(), "devices", "effect", "9", "3"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("404"));
}
