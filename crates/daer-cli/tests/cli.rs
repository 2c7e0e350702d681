// SPDX-License-Identifier: MIT

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn run_with_default_task_succeeds_and_prints_success_status() {
    let mut cmd = Command::cargo_bin("daer").unwrap();
    cmd.args(["run", "--format", "json"]);
    cmd.assert().success().stdout(predicate::str::contains("\"status\": \"SUCCESS\""));
}

#[test]
fn run_rejects_a_task_that_is_not_valid_json() {
    let mut cmd = Command::cargo_bin("daer").unwrap();
    cmd.args(["run", "--task", "{not json"]);
    cmd.assert().failure();
}

#[test]
fn dag_rejects_a_missing_graph_file() {
    let mut cmd = Command::cargo_bin("daer").unwrap();
    cmd.args(["dag", "--graph", "/nonexistent/graph.json"]);
    cmd.assert().failure();
}

#[test]
fn dag_runs_a_two_node_graph_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("graph.json");
    std::fs::write(
        &graph_path,
        r#"[
            {"id": "a", "agent_ref": "echo", "task_input": "first", "dependencies": []},
            {"id": "b", "agent_ref": "echo", "task_input": "second", "dependencies": ["a"]}
        ]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("daer").unwrap();
    cmd.args(["dag", "--graph", graph_path.to_str().unwrap(), "--format", "json"]);
    cmd.assert().success().stdout(predicate::str::contains("\"status\": \"Success\""));
}
