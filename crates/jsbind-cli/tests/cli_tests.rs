//! The `resolve` command against unit files on disk.

use clap::Parser;
use jsbind_cli::args::{CliArgs, Command, ResolveArgs};
use jsbind_cli::run_resolve;
use serde_json::Value;
use std::path::Path;

const SHAPES: &str = r#"{
    "package": "draw",
    "types": [
        { "name": "Shape", "methods": [{ "name": "area", "returnType": "double" }] },
        { "name": "Square", "superclass": "Shape",
          "fields": [{ "name": "side", "type": "double" }] }
    ]
}"#;

const CANVAS: &str = r#"{
    "package": "draw",
    "functions": [{ "name": "paint", "body": [
        { "kind": "var", "type": "Brush", "name": "brush" }
    ] }]
}"#;

fn write_units(dir: &Path) {
    std::fs::write(dir.join("Shapes.js"), SHAPES).expect("write Shapes.js");
    std::fs::write(dir.join("Canvas.js"), CANVAS).expect("write Canvas.js");
}

fn args(dir: &Path, extra: &[&str]) -> ResolveArgs {
    let shapes = dir.join("Shapes.js").to_string_lossy().into_owned();
    let canvas = dir.join("Canvas.js").to_string_lossy().into_owned();
    let mut argv = vec!["jsbind", "resolve", shapes.as_str(), canvas.as_str()];
    argv.extend_from_slice(extra);
    match CliArgs::try_parse_from(argv).expect("valid arguments").command {
        Command::Resolve(resolve) => resolve,
    }
}

fn records(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
        .collect()
}

#[test]
fn test_prints_trees_then_keys_then_stats() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_units(dir.path());
    let mut output = Vec::new();
    let stats = run_resolve(
        &args(dir.path(), &["--ast-for", "Shapes.js", "--key", "Ldraw/Square;", "--key", "I"]),
        &mut output,
    )
    .expect("resolve succeeds");

    let records = records(&output);
    assert_eq!(records.len(), 4);

    let ast = &records[0];
    assert_eq!(ast["kind"], "ast");
    assert_eq!(ast["file"], "Shapes.js");
    assert_eq!(ast["hasBindings"], true);
    let keys: Vec<&str> = ast["declarations"]
        .as_array()
        .expect("declarations")
        .iter()
        .filter_map(|d| d["key"].as_str())
        .collect();
    assert!(keys.contains(&"Ldraw/Shape;"), "{keys:?}");
    assert!(keys.contains(&"Ldraw/Square;.side)D"), "{keys:?}");

    assert_eq!(records[1]["kind"], "binding");
    assert_eq!(records[1]["key"], "Ldraw/Square;");
    assert_eq!(records[1]["binding"]["kind"], "type");
    assert_eq!(records[1]["binding"]["name"], "Square");
    assert_eq!(records[2]["key"], "I");
    assert_eq!(records[2]["binding"]["name"], "int");

    assert_eq!(records[3]["kind"], "stats");
    assert_eq!(records[3]["deliveredAsts"], 1);
    assert_eq!(records[3]["releasedUnits"], 1);
    assert_eq!(stats.delivered_bindings, 2);
}

#[test]
fn test_recovery_flag_reaches_the_pass() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_units(dir.path());

    let mut output = Vec::new();
    run_resolve(&args(dir.path(), &["--ast-for", "Canvas.js", "--recovery"]), &mut output)
        .expect("resolve succeeds");
    let recovered = records(&output);
    let brush = recovered[0]["declarations"]
        .as_array()
        .expect("declarations")
        .iter()
        .find(|d| d["name"] == "brush")
        .cloned()
        .expect("recovered local");
    assert_eq!(brush["recovered"], true);

    let mut output = Vec::new();
    run_resolve(&args(dir.path(), &["--ast-for", "Canvas.js"]), &mut output)
        .expect("resolve succeeds");
    let unrecovered = records(&output);
    let declarations = unrecovered[0]["declarations"].as_array().expect("declarations");
    assert!(declarations.iter().all(|d| d["name"] != "brush"));
}

#[test]
fn test_unknown_key_is_null() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_units(dir.path());
    let mut output = Vec::new();
    run_resolve(&args(dir.path(), &["--key", "Ldraw/Missing;"]), &mut output)
        .expect("resolve succeeds");
    let records = records(&output);
    assert_eq!(records[0]["key"], "Ldraw/Missing;");
    assert!(records[0]["binding"].is_null());
}

#[test]
fn test_syntax_only_and_pretty_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_units(dir.path());
    let mut output = Vec::new();
    let stats = run_resolve(
        &args(dir.path(), &["--all-asts", "--syntax-only", "--pretty"]),
        &mut output,
    )
    .expect("resolve succeeds");
    assert_eq!(stats.delivered_asts, 2);
    assert_eq!(stats.processed_units, 0);

    let text = String::from_utf8(output).expect("utf-8");
    assert!(text.contains("\n  \"kind\": \"ast\""), "{text}");
    assert!(text.contains("\"hasBindings\": false"), "{text}");
}

#[test]
fn test_missing_unit_file_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut output = Vec::new();
    let err = run_resolve(&args(dir.path(), &[]), &mut output).expect_err("no unit files");
    assert!(err.to_string().contains("failed to read unit"), "{err}");
    assert!(output.is_empty());
}
