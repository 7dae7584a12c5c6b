//! End-to-end tests for the `docshape` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command with an isolated, empty config file
fn docshape(temp: &TempDir) -> Command {
    let config_path = temp.path().join("config.toml");
    if !config_path.exists() {
        fs::write(&config_path, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("docshape").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config_path);
    cmd
}

// ============================================================================
// translate
// ============================================================================

#[test]
fn test_translate_from_file() {
    let temp = TempDir::new().unwrap();
    let descriptor = temp.path().join("query.json");
    fs::write(
        &descriptor,
        r#"{"collection": "Products", "predicate": {"kind": "like", "field": "description", "pattern": "BOOK"}}"#,
    )
    .unwrap();

    docshape(&temp)
        .arg("translate")
        .arg(&descriptor)
        .assert()
        .success()
        .stdout("db.Products.find({description: /.*BOOK.*/})\n");
}

#[test]
fn test_translate_from_stdin_yaml() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .arg("translate")
        .write_stdin("collection: Accounts\nprojectedFields: [createdAt, updatedAt]\nexcludeId: true\n")
        .assert()
        .success()
        .stdout("db.Accounts.find({}, {_id: 0, createdAt: 1, updatedAt: 1})\n");
}

#[test]
fn test_translate_command_renderer_compact() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .args(["translate", "--renderer", "command", "--compact"])
        .write_stdin(r#"{"collection": "t", "predicate": "in(a, 1, 2)"}"#)
        .assert()
        .success()
        .stdout("{\"find\":\"t\",\"filter\":{\"a\":{\"$in\":[1,2]}}}\n");
}

#[test]
fn test_translate_explain() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .args(["translate", "--explain"])
        .write_stdin(r#"{"collection": "t", "predicate": "eq(a, 1)"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("rule: select"))
        .stdout(predicate::str::contains("db.t.find({a: 1})"));
}

#[test]
fn test_translate_uses_config_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[render]\nquote_keys = true\n\n[catalog]\ndisabled_rules = [\"and-disjoint\"]\n",
    )
    .unwrap();

    docshape(&temp)
        .arg("translate")
        .write_stdin(r#"{"collection": "t", "predicate": "and(eq(a, 1), eq(b, 2))"}"#)
        .assert()
        .success()
        .stdout("db.t.find({\"$and\": [{\"a\": 1}, {\"b\": 2}]})\n");
}

#[test]
fn test_translate_unsupported_shape_fails() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .arg("translate")
        .write_stdin(r#"{"collection": "t", "predicate": {"kind": "FULL_TEXT_SEARCH", "field": "x"}}"#)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unsupported predicate shape 'FULL_TEXT_SEARCH'"));
}

#[test]
fn test_translate_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .arg("translate")
        .arg(temp.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read descriptor file"));
}

// ============================================================================
// parse / rules
// ============================================================================

#[test]
fn test_parse_prints_normalized_json() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .arg("parse")
        .write_stdin(r#"{"collection": "orders", "groupBy": ["cust_id"], "predicate": "having(count, gt, 1)"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"collection\": \"orders\""))
        .stdout(predicate::str::contains("\"having\""));
}

#[test]
fn test_rules_table() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("like-contains"))
        .stdout(predicate::str::contains("group-having"))
        .stdout(predicate::str::contains("Placeholders"));
}

#[test]
fn test_rules_examples() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .args(["rules", "--examples"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=> db.inventory.find("))
        .stdout(predicate::str::contains("=> db.inventory.aggregate("));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), "[render\n").unwrap();
    docshape(&temp)
        .arg("rules")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_logs_go_to_stderr() {
    let temp = TempDir::new().unwrap();
    docshape(&temp)
        .args(["--log-level", "debug", "translate"])
        .write_stdin(r#"{"collection": "t"}"#)
        .assert()
        .success()
        .stdout("db.t.find({})\n")
        .stderr(predicate::str::contains("DEBUG"));
}
