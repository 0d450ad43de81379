mod common;

use std::fs;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use common::{ROSTER_CSV, TestWorkspace};

fn transform_json(workspace: &TestWorkspace, extra: &[&str]) -> Value {
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace
        .command("transform")
        .args(workspace.source_args(&input))
        .args(["--today", "2026-10-19", "--sequential-ids"])
        .args(extra)
        .output()
        .expect("run transform");
    assert!(output.status.success(), "transform failed: {output:?}");
    serde_json::from_slice(&output.stdout).expect("transform emits JSON")
}

#[test]
fn probe_lists_dynamic_fields_with_types() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    workspace
        .command("probe")
        .args(workspace.source_args(&input))
        .assert()
        .success()
        .stdout(contains("bonus").and(contains("number")))
        .stdout(contains("review_date").and(contains("date")))
        .stdout(contains("remote").and(contains("boolean")))
        .stdout(contains("Department").not());
}

#[test]
fn probe_emits_descriptor_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace
        .command("probe")
        .args(workspace.source_args(&input))
        .args(["--format", "json"])
        .output()
        .expect("run probe");
    assert!(output.status.success());
    let fields: Value = serde_json::from_slice(&output.stdout).expect("json");
    let names: Vec<&str> = fields
        .as_array()
        .expect("array")
        .iter()
        .map(|field| field["normalizedName"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["bonus", "remote", "review_date", "shift"]);
    assert_eq!(fields[0]["type"], "number");
    assert_eq!(fields[0]["isCore"], false);
}

#[test]
fn transform_writes_canonical_records() {
    let workspace = TestWorkspace::new();
    let records = transform_json(&workspace, &[]);
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["name"], "Ali");
    assert_eq!(records[0]["status"], "active");
    assert_eq!(records[0]["dynamicFields"]["bonus"], 500.0);
    assert_eq!(records[0]["dynamicFields"]["remote"], true);
    assert_eq!(records[1]["id"], "EMP0001");
    assert_eq!(records[1]["status"], "inactive");
    assert_eq!(records[2]["status"], "active");
}

#[test]
fn transform_writes_output_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace.path().join("employees.json");
    workspace
        .command("transform")
        .args(workspace.source_args(&input))
        .args(["--sequential-ids", "-o", output.to_str().expect("utf-8 path")])
        .assert()
        .success();
    let contents = fs::read_to_string(&output).expect("read output");
    let records: Value = serde_json::from_str(&contents).expect("json");
    assert_eq!(records.as_array().map(Vec::len), Some(3));
}

#[test]
fn transform_reads_stdin_and_tsv() {
    let workspace = TestWorkspace::new();
    workspace
        .command("transform")
        .args(["-i", "-", "--no-cache", "--sequential-ids"])
        .write_stdin("Name,Overtime\nAli,12\n")
        .assert()
        .success()
        .stdout(contains("\"overtime\": 12"));

    let tsv = workspace.write("roster.tsv", "Name\tShift\nSara\tday\n");
    workspace
        .command("transform")
        .args(workspace.source_args(&tsv))
        .assert()
        .success()
        .stdout(contains("\"shift\": \"day\""));
}

#[test]
fn hidden_fields_leave_the_table_but_not_the_records() {
    let workspace = TestWorkspace::new();
    workspace
        .command("fields")
        .args(["hide", "Bonus"])
        .assert()
        .success();

    let input = workspace.write("roster.csv", ROSTER_CSV);
    workspace
        .command("transform")
        .args(workspace.source_args(&input))
        .args(["--table", "--today", "2026-10-19"])
        .assert()
        .success()
        .stdout(contains("Job Title").and(contains("Shift")))
        .stdout(contains("Bonus").not());

    let records = transform_json(&workspace, &[]);
    assert_eq!(records[0]["dynamicFields"]["bonus"], 500.0);
}

#[test]
fn stats_follow_the_enabled_selection() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);

    let run_stats = |extra: &[&str]| -> Value {
        let output = workspace
            .command("stats")
            .args(workspace.source_args(&input))
            .args(["--today", "2026-10-19", "--format", "json"])
            .args(extra)
            .output()
            .expect("run stats");
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).expect("json")
    };

    let report = run_stats(&[]);
    assert_eq!(report["summary"]["total"], 3);
    assert_eq!(report["summary"]["inactive"], 1);
    assert_eq!(report["cards"].as_array().map(Vec::len), Some(0));

    workspace
        .command("fields")
        .args(["enable-stats", "remote", "Shift"])
        .assert()
        .success();
    let report = run_stats(&[]);
    let cards = report["cards"].as_array().expect("cards");
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["kind"], "boolean");
    assert_eq!(cards[0]["stats"]["trueCount"], 2);
    assert_eq!(cards[1]["stats"]["topValues"][0]["value"], "night");

    let report = run_stats(&["--all"]);
    assert_eq!(report["cards"].as_array().map(Vec::len), Some(3));

    let distributions = report["distributions"].as_array().expect("distributions");
    let fields: Vec<&str> = distributions
        .iter()
        .map(|card| card["field"].as_str().expect("field"))
        .collect();
    assert_eq!(fields, vec!["department", "location", "status"]);
    assert_eq!(distributions[0]["stats"]["topValues"][0]["value"], "IT");
    assert_eq!(distributions[0]["stats"]["topValues"][0]["count"], 2);
}

#[test]
fn enable_stats_all_selects_every_discovered_field() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    workspace
        .command("fields")
        .args(["enable-stats", "--all", "-i"])
        .arg(&input)
        .assert()
        .success();

    let stats = fs::read_to_string(workspace.settings_dir().join("hr_stats_settings.json"))
        .expect("stats blob");
    assert_eq!(
        stats,
        r#"{"enabledFields":["bonus","remote","review_date","shift"]}"#
    );

    workspace
        .command("stats")
        .args(workspace.source_args(&input))
        .args(["--today", "2026-10-19", "--format", "json"])
        .assert()
        .success()
        .stdout(contains("\"field\": \"shift\""));
}

#[test]
fn fields_reset_clears_each_selection() {
    let workspace = TestWorkspace::new();
    workspace.command("fields").args(["hide", "bonus"]).assert().success();
    workspace
        .command("fields")
        .args(["enable-stats", "shift"])
        .assert()
        .success();
    workspace
        .command("fields")
        .arg("list")
        .assert()
        .success()
        .stdout(contains("bonus").and(contains("shift")));

    workspace
        .command("fields")
        .args(["reset", "visibility"])
        .assert()
        .success();
    workspace
        .command("fields")
        .arg("list")
        .assert()
        .success()
        .stdout(contains("shift").and(contains("bonus").not()));

    workspace.command("fields").args(["reset", "all"]).assert().success();
    workspace
        .command("fields")
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No hidden or stats-enabled fields."));
}

#[test]
fn corrupt_settings_are_treated_as_empty() {
    let workspace = TestWorkspace::new();
    fs::create_dir_all(workspace.settings_dir()).expect("settings dir");
    fs::write(workspace.settings_dir().join("hr_field_settings.json"), "{oops").expect("write");
    workspace
        .command("fields")
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No hidden or stats-enabled fields."));
}

#[test]
fn cached_batch_is_used_when_input_is_omitted() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    workspace
        .command("probe")
        .args(workspace.source_args(&input))
        .assert()
        .success();

    let settings_dir = workspace.settings_dir();
    workspace
        .command("probe")
        .args(["--settings-dir", settings_dir.to_str().expect("utf-8 path")])
        .assert()
        .success()
        .stdout(contains("review_date"));
}

#[test]
fn missing_input_without_cache_fails() {
    let workspace = TestWorkspace::new();
    let settings_dir = workspace.settings_dir();
    workspace
        .command("probe")
        .args(["--settings-dir", settings_dir.to_str().expect("utf-8 path")])
        .assert()
        .failure()
        .stderr(contains("error: No --input given"));
}

#[test]
fn form_applies_submitted_values_to_a_record() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace
        .command("form")
        .args(workspace.source_args(&input))
        .args([
            "--record",
            "E-1",
            "--set",
            "dynamic_bonus=750",
            "--set",
            "dynamic_review_date=4/2/2025",
            "--format",
            "json",
        ])
        .output()
        .expect("run form");
    assert!(output.status.success());
    let form: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(form["record"]["name"], "Ali");
    assert_eq!(form["record"]["dynamicFields"]["bonus"], 750.0);
    assert_eq!(form["record"]["dynamicFields"]["review_date"], "2025-04-02");
    let controls = form["controls"].as_array().expect("controls");
    assert_eq!(controls[0]["name"], "name");
    assert_eq!(controls[0]["value"], "Ali");
    let dynamic: Vec<&Value> = controls
        .iter()
        .filter(|control| control["name"].as_str().is_some_and(|name| name.starts_with("dynamic_")))
        .collect();
    assert_eq!(dynamic[0]["name"], "dynamic_bonus");
    assert_eq!(dynamic[0]["kind"], "number");
    assert_eq!(dynamic[0]["value"], "750");
    assert_eq!(dynamic[1]["kind"], "select");
}

#[test]
fn form_and_transform_agree_on_generated_ids() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let records = transform_json(&workspace, &[]);
    assert_eq!(records[1]["id"], "EMP0001");

    let output = workspace
        .command("form")
        .args(workspace.source_args(&input))
        .args(["--sequential-ids", "--record", "EMP0001", "--format", "json"])
        .output()
        .expect("run form");
    assert!(output.status.success(), "form failed: {output:?}");
    let form: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(form["record"]["name"], "Sara");
}

#[test]
fn table_output_refuses_an_output_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace.path().join("employees.json");
    workspace
        .command("transform")
        .args(workspace.source_args(&input))
        .args(["--table", "-o", output.to_str().expect("utf-8 path")])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
    assert!(!output.exists());
}

fn employee(workspace: &TestWorkspace, input: &std::path::Path, args: &[&str]) -> assert_cmd::assert::Assert {
    workspace
        .command("employee")
        .args(workspace.source_args(input))
        .args(["--today", "2026-10-19", "--sequential-ids"])
        .args(args)
        .assert()
}

#[test]
fn employee_edits_persist_over_the_loaded_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);

    employee(
        &workspace,
        &input,
        &["add", "--set", "name=Lina", "--set", "department=Ops", "--set", "dynamic_bonus=900"],
    )
    .success()
    .stdout(contains("EMP0002"));
    employee(
        &workspace,
        &input,
        &["update", "E-1", "--set", "jobTitle=Lead", "--set", "status=inactive"],
    )
    .success();
    employee(&workspace, &input, &["delete", "E-3"]).success();

    let records = transform_json(&workspace, &[]);
    let records = records.as_array().expect("array");
    let ids: Vec<&str> = records
        .iter()
        .map(|record| record["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["E-1", "EMP0001", "EMP0002"]);
    assert_eq!(records[0]["jobTitle"], "Lead");
    assert_eq!(records[0]["status"], "inactive");
    assert_eq!(records[0]["dynamicFields"]["bonus"], 500.0);
    assert_eq!(records[2]["name"], "Lina");
    assert_eq!(records[2]["dynamicFields"]["bonus"], 900.0);
    assert_eq!(records[2]["dynamicFields"]["shift"], "");

    employee(&workspace, &input, &["show", "EMP0002"])
        .success()
        .stdout(contains("Lina").and(contains("Ops")));

    employee(&workspace, &input, &["reset"]).success();
    let records = transform_json(&workspace, &[]);
    assert_eq!(records.as_array().map(Vec::len), Some(3));
}

#[test]
fn employee_update_and_delete_report_unknown_ids() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    employee(&workspace, &input, &["update", "nope", "--set", "name=X"])
        .failure()
        .stderr(contains("No employee with ID 'nope'"));
    employee(&workspace, &input, &["delete", "nope"])
        .failure()
        .stderr(contains("No employee with ID 'nope'"));
    employee(&workspace, &input, &["add", "--set", "name=Dup", "--set", "id=E-1"])
        .failure()
        .stderr(contains("already exists"));
    employee(&workspace, &input, &["update", "E-1", "--set", "id=E-2"])
        .failure()
        .stderr(contains("cannot change"));
}

#[test]
fn unknown_record_id_is_reported() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    workspace
        .command("form")
        .args(workspace.source_args(&input))
        .args(["--record", "nope"])
        .assert()
        .failure()
        .stderr(contains("No employee with ID 'nope'"));
}
