//! Integration tests for the `scrunch` binary.

use std::fs;
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "scrunch-cli", "--bin", "scrunch", "--"]);
    cmd
}

#[test]
fn test_crunch_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("app.js");
    let output = dir.path().join("app.crunched.js");
    fs::write(
        &input,
        "function add(first, second) {\n    var total = first + second;\n    return total;\n}\n",
    )
    .unwrap();

    let status = cargo_bin()
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .status()
        .expect("Failed to run scrunch");
    assert!(status.success());

    let crunched = fs::read_to_string(&output).unwrap();
    assert_eq!(crunched, "function add(a,b){var c=a+b;return c}");
}

#[test]
fn test_single_input_prints_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("loop.js");
    fs::write(&input, "while (x) { y = y + 1; }\n").unwrap();

    let output = cargo_bin().arg(&input).output().expect("Failed to run scrunch");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "while(x){y=y+1}");
}

#[test]
fn test_json_summary_is_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("app.js");
    fs::write(&input, "function f() { var value = 1; return value; }\n").unwrap();

    let output = cargo_bin()
        .arg(&input)
        .arg("--json")
        .output()
        .expect("Failed to run scrunch");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    let first = &json[0];
    assert_eq!(first["ok"], true);
    assert!(first["size_after"].as_u64().unwrap() < first["size_before"].as_u64().unwrap());
    assert_eq!(first["errors"], 0);

    // JSON mode writes code to the default sibling file
    assert!(dir.path().join("app.min.js").exists());
}

#[test]
fn test_multiple_inputs_get_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one.js");
    let two = dir.path().join("two.js");
    fs::write(&one, "function f() { var aa = 1; return aa; }\n").unwrap();
    fs::write(&two, "function g() { var bb = 2; return bb; }\n").unwrap();

    let status = cargo_bin().arg(&one).arg(&two).status().expect("Failed to run scrunch");
    assert!(status.success());

    assert_eq!(
        fs::read_to_string(dir.path().join("one.min.js")).unwrap(),
        "function f(){var a=1;return a}"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("two.min.js")).unwrap(),
        "function g(){var a=2;return a}"
    );
}

#[test]
fn test_no_rename_keeps_names() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("app.js");
    fs::write(&input, "function f() { var value = 1; return value; }\n").unwrap();

    let output = cargo_bin()
        .arg(&input)
        .arg("--no-rename")
        .output()
        .expect("Failed to run scrunch");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "function f(){var value=1;return value}");
}

#[test]
fn test_syntax_error_fails_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.js");
    fs::write(&input, "var = ;\n").unwrap();

    let output = cargo_bin()
        .arg(&input)
        .arg("--json")
        .output()
        .expect("Failed to run scrunch");
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json[0]["ok"], false);
    assert!(json[0]["error"].as_str().unwrap().contains("syntax error"));
}
