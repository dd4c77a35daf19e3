//! End-to-end tests for `controller-auditor validate` command.

use std::process::Command;

mod fixtures;
use fixtures::*;

/// Path to the controller-auditor binary
fn auditor_bin() -> &'static str {
    env!("CARGO_BIN_EXE_controller-auditor")
}

#[test]
fn test_validate_valid_manifest() {
    let (manifest, _temp_dir) = create_temp_manifest(&test_layout("pad", 3));

    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", manifest.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(
        output.status.code(),
        Some(0),
        "Valid manifest should exit with code 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓"), "Output should indicate success");
    assert!(stdout.contains("pad"));
}

#[test]
fn test_validate_valid_manifest_json() {
    let (manifest, _temp_dir) = create_temp_manifest(&test_layout("pad", 3));

    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", manifest.to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));

    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Should parse JSON output");
    assert_eq!(result["valid"], true);
    assert_eq!(result["id"], "pad");
    assert_eq!(result["version_code"], 3);
    assert!(result["failed_check"].is_null());
    assert_eq!(result["violations"].as_array().unwrap().len(), 0);
}

#[test]
fn test_validate_unknown_style_json() {
    let (manifest, _temp_dir) = create_temp_manifest(&test_layout_with_missing_style("pad"));

    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", manifest.to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1), "Violations exit with code 1");

    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Should parse JSON output");
    assert_eq!(result["valid"], false);
    assert_eq!(result["failed_check"], "style_refs");

    let violations = result["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0]["path"],
        "viewGroups[0].viewData.buttonList[0].style"
    );
    assert_eq!(violations[0]["kind"], "unknown_button_style");
    assert_eq!(violations[0]["detail"], "missing");
}

#[test]
fn test_validate_reference_cycle_is_not_a_schema_error() {
    let (manifest, _temp_dir) = create_temp_manifest(&test_layout_with_cycle("pad", 1));

    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", manifest.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_validate_malformed_json() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let manifest = temp_dir.path().join("1.json");
    std::fs::write(&manifest, "{ not json").unwrap();

    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", manifest.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid manifest"));
}

#[test]
fn test_validate_missing_file() {
    let output = Command::new(auditor_bin())
        .args(["validate", "--manifest", "/nonexistent/versions/1.json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2), "I/O errors exit with code 2");
}
