// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TRIAGE: &str = r#"
name: Issue triage
on:
  - event: issues
    config:
      types: [opened]
permissions:
  contents: read
  issues: read
safe-outputs:
  add-labels:
    allowed: [bug, enhancement]
  add-comment: {}
"#;

fn flowgate(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("flowgate").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1");
    cmd
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn test_compile_writes_lock_file() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);

    flowgate(&dir)
        .arg("compile")
        .assert()
        .success()
        .stdout(predicate::str::contains("triage.lock.yml"));

    let lock = std::fs::read_to_string(dir.path().join("triage.lock.yml")).unwrap();
    assert!(lock.contains("pre_activation:"));
    assert!(lock.contains("add_labels:"));
    assert!(lock.contains("FLOWGATE_ADD_LABELS_ALLOWED: bug,enhancement"));
    assert!(!lock.contains("Compiled by flowgate"));
}

#[test]
fn test_check_passes_after_compile_and_fails_when_stale() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);

    flowgate(&dir).arg("compile").assert().success();
    flowgate(&dir).args(["compile", "--check"]).assert().success();

    std::fs::write(dir.path().join("triage.lock.yml"), "name: edited by hand\n").unwrap();
    flowgate(&dir)
        .args(["compile", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of date"));
}

#[test]
fn test_release_header_from_config_file() {
    let dir = project(&[
        ("triage.workflow.yaml", TRIAGE),
        ("flowgate.toml", "release-build = true\nversion = \"9.9.9\"\n"),
    ]);

    flowgate(&dir).arg("compile").assert().success();
    let lock = std::fs::read_to_string(dir.path().join("triage.lock.yml")).unwrap();
    assert!(lock.starts_with("# Compiled by flowgate v9.9.9. Do not edit.\n"));
}

#[test]
fn test_compile_reports_policy_error() {
    let dir = project(&[(
        "writer.workflow.yaml",
        "name: writer\nroles: all\npermissions:\n  contents: write\n",
    )]);

    flowgate(&dir)
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Write permissions are not allowed"));
    assert!(!dir.path().join("writer.lock.yml").exists());
}

#[test]
fn test_no_matching_files() {
    let dir = TempDir::new().unwrap();
    flowgate(&dir)
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No workflow files matched"));
}

#[test]
fn test_strict_flag_rejects_raw_domains() {
    let dir = project(&[(
        "net.workflow.yaml",
        "name: net\nroles: all\nnetwork:\n  allowed: [defaults, example.com]\n",
    )]);

    flowgate(&dir).arg("compile").assert().success();
    flowgate(&dir)
        .args(["compile", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("example.com"));
}

#[test]
fn test_validate_command() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);
    flowgate(&dir)
        .args(["validate", "triage.workflow.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow is valid"));
}

#[test]
fn test_graph_mermaid() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);
    flowgate(&dir)
        .args(["graph", "triage.workflow.yaml", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph TD"))
        .stdout(predicate::str::contains("pre_activation --> activation"))
        .stdout(predicate::str::contains("agent --> add_comment"));
}

#[test]
fn test_directory_flag() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);
    let outer = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("flowgate").unwrap();
    cmd.current_dir(outer.path())
        .arg("-C")
        .arg(dir.path())
        .args(["graph", "triage.workflow.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. pre_activation"));
}

#[test]
fn test_validate_reports_graph_errors() {
    let dir = project(&[(
        "loop.workflow.yaml",
        "name: loop\nroles: all\njobs:\n  a:\n    needs: [b]\n    steps: [{run: echo}]\n  b:\n    needs: [a]\n    steps: [{run: echo}]\n",
    )]);
    flowgate(&dir)
        .args(["validate", "loop.workflow.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

#[test]
fn test_validate_json_report() {
    let dir = project(&[("triage.workflow.yaml", TRIAGE)]);
    let output = flowgate(&dir)
        .args(["validate", "triage.workflow.yaml", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["valid"], true);
    assert!(report["jobs"].as_array().unwrap().iter().any(|j| j == "add_labels"));
}

#[test]
fn test_verbose_errors_include_guidance() {
    let dir = project(&[(
        "writer.workflow.yaml",
        "name: writer\nroles: all\npermissions:\n  contents: write\n",
    )]);

    flowgate(&dir)
        .args(["compile", "-v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prompt injection"))
        .stderr(predicate::str::contains("Downgrade write permissions to read"));

    flowgate(&dir)
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("prompt injection").not());
}
