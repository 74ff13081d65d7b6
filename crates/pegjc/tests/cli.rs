//! End-to-end tests for the `pegjc` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn pegjc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pegjc"))
}

const CALC_JSON: &str = r#"{
    "type": "grammar",
    "initializer": { "type": "initializer", "code": "int depth;" },
    "rules": [
        {
            "type": "rule",
            "name": "start",
            "expression": {
                "type": "action",
                "code": "return ds.size();",
                "annotations": [{ "name": "Return", "params": ["int"] }],
                "expression": {
                    "type": "labeled",
                    "label": "ds",
                    "expression": { "type": "one_or_more", "expression": { "type": "rule_ref", "name": "digit" } }
                }
            }
        },
        {
            "type": "rule",
            "name": "digit",
            "expression": {
                "type": "class",
                "parts": [["0", "9"]],
                "rawText": "[0-9]"
            }
        }
    ]
}"#;

const UNTYPED_JSON: &str = r#"{
    "type": "grammar",
    "rules": [
        {
            "type": "rule",
            "name": "start",
            "expression": { "type": "action", "code": "return 1;", "expression": { "type": "any" } }
        }
    ]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(pegjc_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pegjc")
}

// ── generate ─────────────────────────────────────────────────────────

#[test]
fn generate_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "calc.json", CALC_JSON);

    let output = run(&["generate", ast.to_str().unwrap(), "--class-name", "Calc"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let java = String::from_utf8_lossy(&output.stdout);
    assert!(java.contains("public class Calc extends State implements IParser<Object> {"));
    assert!(java.contains("final class CalcUserCode {"));
    assert!(java.contains("int depth;"));
    assert!(java.contains("public static final IBaseParser<Integer> START"));
    assert!(java.contains("int f0(List<Character> ds) {return ds.size();}"));
}

#[test]
fn generate_to_file_with_config() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "calc.json", CALC_JSON);
    let config = write(
        dir.path(),
        "pegj.toml",
        "package = \"com.example\"\nclass-name = \"FromConfig\"\nallowed-start-rules = [\"digit\"]\n",
    );
    let out = dir.path().join("Out.java");

    let output = run(&[
        "generate",
        ast.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--package",
        "com.example.override",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    let java = std::fs::read_to_string(&out).unwrap();
    assert!(java.starts_with("package com.example.override;\n"));
    assert!(java.contains("public class FromConfig "));
    assert!(java.contains("IBaseParser<Character> DIGIT"));
    assert!(java.contains("@Rule(name=\"start\", isStart=false)"));
}

#[test]
fn unknown_start_rule_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "calc.json", CALC_JSON);

    let output = run(&["generate", ast.to_str().unwrap(), "--start-rule", "nope", "--no-color"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("start rule `nope` is not defined"), "stderr: {}", stderr);
}

#[test]
fn strict_types_reject_untyped_actions() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "untyped.json", UNTYPED_JSON);

    let lenient = run(&["generate", ast.to_str().unwrap()]);
    assert!(lenient.status.success());

    let strict = run(&["generate", ast.to_str().unwrap(), "--strict-types", "--json"]);
    assert!(!strict.status.success());

    let stderr = String::from_utf8_lossy(&strict.stderr);
    let mut stream = serde_json::Deserializer::from_str(&stderr).into_iter::<serde_json::Value>();
    let first = stream
        .next()
        .expect("no JSON object in stderr")
        .expect("first JSON object is not valid");
    assert_eq!(first["severity"], "error");
    assert_eq!(first["message"], "missing default return type for action result");
    assert!(first.get("spans").is_some());
}

#[test]
fn malformed_ast_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "bad.json", "{ \"type\": \"grammar\" }");

    let output = run(&["generate", ast.to_str().unwrap(), "--no-color"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed grammar AST"), "stderr: {}", stderr);
}

// ── types ────────────────────────────────────────────────────────────

#[test]
fn types_lists_rule_types() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "calc.json", CALC_JSON);

    let output = run(&["types", ast.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["start: int", "digit: char"]);
}

#[test]
fn types_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let ast = write(dir.path(), "calc.json", CALC_JSON);

    let output = run(&["types", ast.to_str().unwrap(), "--json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first: serde_json::Value =
        serde_json::from_str(stdout.lines().next().expect("one line per rule")).unwrap();
    assert_eq!(first["rule"], "start");
    assert_eq!(first["type"], "int");
    assert_eq!(first["primitive"], true);
}
