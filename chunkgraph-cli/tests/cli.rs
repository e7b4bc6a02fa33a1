use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};

fn call(opcode: u16) -> Value {
    json!({ "opcode": opcode })
}

fn behavior(instance: u32, calls: &[u16]) -> Value {
    let instructions: Vec<Value> = calls.iter().map(|&op| call(op)).collect();
    json!({
        "type_code": "BHAV",
        "group": 7,
        "instance": instance,
        "decoded": { "kind": "behavior", "instructions": instructions },
    })
}

/// One object container: a chair with an interaction, a mutual-recursion
/// pair, and optionally a dangling call, a dead routine, and an unused
/// draw group.
fn chair(broken: bool) -> Value {
    let mut chunks = vec![
        json!({
            "type_code": "OBJD", "group": 7, "instance": 128, "label": "chair",
            "decoded": {
                "kind": "object_definition",
                "guid": 1,
                "base_graphic_id": 100,
                "tree_table_id": 128,
                "entry_points": [{ "name": "main", "routine_id": 0x1000 }],
            },
        }),
        json!({
            "type_code": "TTAB", "group": 7, "instance": 128,
            "decoded": {
                "kind": "interaction_table",
                "entries": [
                    { "guard_routine": 0x1001, "action_routine": 0x1002, "string_index": 0 },
                ],
            },
        }),
        json!({
            "type_code": "TTAs", "group": 7, "instance": 128,
            "decoded": { "kind": "strings", "entries": ["Sit"] },
        }),
        behavior(0x1000, &[0x1002]),
        behavior(0x1001, &[0x0002]),
        behavior(0x1002, &[0x1003]),
        json!({
            "type_code": "DGRP", "group": 7, "instance": 100,
            "decoded": {
                "kind": "draw_group",
                "images": [{ "direction": 0, "zoom": 0, "sprite_ids": [200] }],
            },
        }),
        json!({
            "type_code": "SPR2", "group": 7, "instance": 200,
            "decoded": { "kind": "sprite", "frame_count": 1 },
        }),
    ];
    if broken {
        chunks.push(behavior(0x1003, &[0x1002, 0x1009]));
        chunks.push(behavior(0x1005, &[0x1001]));
        chunks.push(json!({
            "type_code": "DGRP", "group": 7, "instance": 101,
            "decoded": { "kind": "draw_group" },
        }));
    } else {
        chunks.push(behavior(0x1003, &[0x1002]));
    }
    json!({ "path": "objects/chair.iff", "chunks": chunks })
}

fn write_dump(dir: &Path, name: &str, dump: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(dump).unwrap()).unwrap();
    path
}

fn chunkgraph(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chunkgraph").unwrap();
    cmd.current_dir(dir).env_remove("CHUNKGRAPH_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    chunkgraph(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("blast-radius"))
        .stdout(predicate::str::contains("dead-code"));
}

#[test]
fn stats_json_counts_nodes_and_phantoms() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    let output = chunkgraph(dir.path())
        .args(["stats", "--format", "json"])
        .arg(&dump)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["build"]["files_read"], 1);
    assert_eq!(value["graph"]["node_count"], 9);
    assert_eq!(value["graph"]["phantom_count"], 0);
}

#[test]
fn cycles_reports_mutual_recursion() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    chunkgraph(dir.path())
        .arg("cycles")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("[mutual] BHAV#4098, BHAV#4099"));
}

#[test]
fn validate_clean_content_has_no_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_dump(dir.path(), "chair.json", &chair(false));
    chunkgraph(dir.path())
        .args(["validate", "--fail-on-error", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing_ref").not());
}

#[test]
fn validate_fail_on_error_exits_10() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(true));
    chunkgraph(dir.path())
        .args(["validate", "--fail-on-error"])
        .arg(&dump)
        .assert()
        .code(10)
        .stdout(predicate::str::contains("missing_ref"))
        .stdout(predicate::str::contains("BHAV#4105"));
}

#[test]
fn validate_without_flag_succeeds_despite_errors() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(true));
    let output = chunkgraph(dir.path())
        .args(["validate", "--format", "json"])
        .arg(&dump)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["severity_counts"]["error"], 1);
    assert_eq!(value["severity_counts"]["warning"], 2);
    assert_eq!(value["severity_counts"]["suggestion"], 0);
}

#[test]
fn dead_code_finds_unreachable_routine() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(true));
    chunkgraph(dir.path())
        .arg("dead-code")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("BHAV#4101"))
        .stdout(predicate::str::contains("DGRP#101"));
}

#[test]
fn blast_radius_walks_callers() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    let output = chunkgraph(dir.path())
        .args(["blast-radius", "BHAV#0x1003@7", "--format", "json"])
        .arg(&dump)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["max_depth"], 3);
    assert_eq!(value["direct_callers"].as_array().unwrap().len(), 1);
    assert!(!value["cyclic_peers"].as_array().unwrap().is_empty());
}

#[test]
fn blast_radius_rejects_malformed_id() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    chunkgraph(dir.path())
        .args(["blast-radius", "not-an-id"])
        .arg(&dump)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot parse resource id"));
}

#[test]
fn orphans_explain_suggests_object_field() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(true));
    chunkgraph(dir.path())
        .args(["orphans", "--explain"])
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("DGRP#101"))
        .stdout(predicate::str::contains("base_graphic_id = 101"));
}

#[test]
fn export_dot_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    let out = dir.path().join("graph.dot");
    chunkgraph(dir.path())
        .args(["export", "--format", "dot", "--output"])
        .arg(&out)
        .arg(&dump)
        .assert()
        .success();
    let dot = std::fs::read_to_string(out).unwrap();
    assert!(dot.starts_with("digraph chunkgraph {"));
    assert!(dot.contains("\"OBJD#128@0x7\""));
}

#[test]
fn report_json_includes_build_summary() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(true));
    let output = chunkgraph(dir.path())
        .args(["report", "--format", "json"])
        .arg(&dump)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["build"]["files_read"], 1);
    assert_eq!(value["cycles"].as_array().unwrap().len(), 1);
    assert!(value["generated_at"].is_string());
}

#[test]
fn missing_input_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    chunkgraph(dir.path())
        .args(["stats", "does-not-exist.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Input not found"));
}

#[test]
fn invalid_config_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    std::fs::write(
        dir.path().join("chunkgraph.toml"),
        "[analysis]\nblast_radius_depth = 0\nmax_sibling_examples = 3\n",
    )
    .unwrap();
    chunkgraph(dir.path())
        .arg("stats")
        .arg(&dump)
        .assert()
        .code(2);
}

#[test]
fn unknown_required_rule_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let dump = write_dump(dir.path(), "chair.json", &chair(false));
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[registry]\nrequired_types = [\"XXXX\"]\n").unwrap();
    chunkgraph(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .arg(&dump)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("XXXX"));
}
