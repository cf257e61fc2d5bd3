//! Smoke tests for the `netloom` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn netloom() -> (Command, tempfile::TempDir) {
    let workdir = tempfile::tempdir().expect("tempdir");
    let mut command = Command::cargo_bin("netloom").expect("binary builds");
    command.current_dir(workdir.path());
    (command, workdir)
}

#[test]
fn plan_renders_the_declaration_graph_as_json() {
    let (mut command, _workdir) = netloom();
    let assert = command.arg("plan").assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let plan: serde_json::Value = serde_json::from_str(&stdout).expect("stdout should be JSON");

    let declarations = plan
        .get("declarations")
        .and_then(serde_json::Value::as_array)
        .expect("plan should carry declarations");
    assert!(!declarations.is_empty());

    let output_resource = plan
        .pointer("/outputs/url/resource")
        .and_then(serde_json::Value::as_str)
        .expect("plan should export the url output");
    assert_eq!(output_resource, "netloom-lab-alb");
}

#[test]
fn plan_honours_zone_count_overrides() {
    let (mut command, _workdir) = netloom();
    let assert = command.args(["plan", "--az-count", "3"]).assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let plan: serde_json::Value = serde_json::from_str(&stdout).expect("stdout should be JSON");
    let nat_count = plan
        .get("declarations")
        .and_then(serde_json::Value::as_array)
        .map(|declarations| {
            declarations
                .iter()
                .filter(|declaration| {
                    declaration.get("kind").and_then(serde_json::Value::as_str)
                        == Some("nat-gateway")
                })
                .count()
        })
        .expect("declarations present");
    assert_eq!(nat_count, 3);
}

#[test]
fn plan_rejects_a_zero_zone_count() {
    let (mut command, _workdir) = netloom();
    command
        .args(["plan", "--az-count", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("az_count"));
}

#[test]
fn plan_rejects_zone_counts_beyond_the_cidr_budget() {
    let (mut command, _workdir) = netloom();
    command
        .args(["plan", "--az-count", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds the CIDR budget"));
}

#[test]
fn plan_writes_to_the_requested_output_path() {
    let (mut command, workdir) = netloom();
    command
        .args(["plan", "--out", "plan.json"])
        .assert()
        .success();

    let written = std::fs::read_to_string(workdir.path().join("plan.json")).expect("file written");
    let plan: serde_json::Value = serde_json::from_str(&written).expect("file should be JSON");
    assert!(plan.get("declarations").is_some());
}

#[test]
fn invoking_without_a_subcommand_prints_usage() {
    let (mut command, _workdir) = netloom();
    command
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
