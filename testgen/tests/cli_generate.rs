//! CLI tests for `testgen` commands.
//!
//! Spawns the testgen binary inside a temp project and verifies exit codes
//! and written files. Runner commands are replaced by `sh` scripts.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use testgen::exit_codes;
use testgen::io::config::{TestgenConfig, write_config};
use testgen::io::init::{InitOptions, TestgenPaths, init_project};

const CALC: &str = "\
def add(a: int, b: int) -> int:
    \"\"\"Add two numbers.\"\"\"
    return a + b


def _internal():
    pass
";

fn testgen(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_testgen"))
        .current_dir(root)
        .args(args)
        .output()
        .expect("run testgen")
}

/// Initialized project whose runner is `sh -c <script>`.
fn project_with_runner(script: &str) -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = init_project(temp.path(), &InitOptions { force: false }).expect("init");
    let mut cfg = TestgenConfig::default();
    cfg.sandbox.command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
    write_config(&paths.config_path, &cfg).expect("write config");
    fs::create_dir_all(temp.path().join("src")).expect("mkdir src");
    fs::write(temp.path().join("src/calc.py"), CALC).expect("write source");
    temp
}

#[test]
fn init_creates_config_and_refuses_second_run() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = testgen(temp.path(), &["init"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    assert!(TestgenPaths::new(temp.path()).config_path.is_file());

    let second = testgen(temp.path(), &["init"]);
    assert_eq!(second.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&second.stderr).contains("already exists"));

    let forced = testgen(temp.path(), &["init", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn generate_writes_test_file_into_configured_dir() {
    let project = project_with_runner("exit 0");

    let output = testgen(project.path(), &["generate", "src/calc.py"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let written = fs::read_to_string(project.path().join("tests/test_calc.py")).expect("read");
    assert!(written.contains("def test_add_basic():"));
    assert!(!written.contains("_internal"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("validation: passed"));
}

#[test]
fn generate_exits_two_when_validation_fails() {
    let project = project_with_runner("echo '1 failed'; exit 1");

    let output = testgen(project.path(), &["generate", "src/calc.py"]);

    assert_eq!(output.status.code(), Some(exit_codes::VALIDATION_FAILED));
    assert!(project.path().join("tests/test_calc.py").is_file());
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 failed"));
}

#[test]
fn no_validate_skips_runner() {
    let project = project_with_runner("exit 1");

    let output = testgen(project.path(), &["generate", "src/calc.py", "--no-validate"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[test]
fn unknown_function_fails() {
    let project = project_with_runner("exit 0");

    let by_flag = testgen(project.path(), &["generate", "src/calc.py", "-f", "mul"]);
    assert_eq!(by_flag.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&by_flag.stdout).contains("unit not found: 'mul'"));

    let by_target = testgen(project.path(), &["generate", "src/calc.py::mul"]);
    assert_eq!(by_target.status.code(), Some(exit_codes::FAILED));
    assert!(!project.path().join("tests/test_calc.py").exists());
}

#[test]
fn json_output_reports_result() {
    let project = project_with_runner("exit 0");

    let output = testgen(
        project.path(),
        &["generate", "src/calc.py", "-o", "out", "--json"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["success"], true);
    assert_eq!(value["tests"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["verdict"]["passed"], true);
    assert_eq!(value["judgment"]["score"], 5.0);
    assert!(project.path().join("out/test_calc.py").is_file());
}

#[test]
fn directory_target_generates_each_file() {
    let project = project_with_runner("exit 0");
    fs::write(
        project.path().join("src/strings.py"),
        "def shout(text: str) -> str:\n    return text.upper()\n",
    )
    .expect("write");
    fs::write(project.path().join("src/test_existing.py"), "def test_x():\n    pass\n")
        .expect("write");

    let output = testgen(project.path(), &["generate", "src"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(project.path().join("tests/test_calc.py").is_file());
    assert!(project.path().join("tests/test_strings.py").is_file());
    assert!(!project.path().join("tests/test_test_existing.py").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 file(s): 2 generated, 0 failed"));
}

#[test]
fn analyze_prints_structural_model() {
    let project = project_with_runner("exit 0");

    let output = testgen(project.path(), &["analyze", "src/calc.py"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["functions"][0]["name"], "add");
    assert_eq!(value["functions"][0]["docstring"], "Add two numbers.");
    assert_eq!(value["functions"][1]["is_private"], true);
}

#[test]
fn analyze_reports_syntax_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("broken.py"), "def broken(:\n").expect("write");

    let output = testgen(temp.path(), &["analyze", "broken.py"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("syntax error"));
}

#[test]
fn fixtures_prints_stubs() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = testgen(temp.path(), &["fixtures", "db", "cache"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("def db_fixture():"));
    assert!(stdout.contains("def cache_fixture():"));
}

#[test]
fn validate_runs_configured_runner_on_test_dir() {
    let project = project_with_runner("echo \"ran $0\"; exit 0");
    fs::create_dir_all(project.path().join("tests")).expect("mkdir");

    let output = testgen(project.path(), &["validate"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ran "));

    let failing = project_with_runner("exit 1");
    fs::create_dir_all(failing.path().join("tests")).expect("mkdir");
    let output = testgen(failing.path(), &["validate", "tests"]);
    assert_eq!(output.status.code(), Some(exit_codes::VALIDATION_FAILED));
}
