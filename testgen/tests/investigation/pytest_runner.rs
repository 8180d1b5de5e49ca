//! Investigation tests running generated scaffolds under real pytest.
//!
//! # Prerequisites
//!
//! - `python3` on `PATH`
//! - `pytest` importable (`python3 -m pip install pytest`)
//!
//! # Running
//!
//! ```bash
//! cargo test --test investigation -- --ignored
//! ```

use std::process::Command;
use std::time::Duration;

use testgen::core::target::Target;
use testgen::io::config::SandboxConfig;
use testgen::io::sandbox::{ProcessSandbox, Sandbox, SandboxRequest};
use testgen::pipeline::{GenerationPipeline, PipelineOptions};
use testgen::test_support::SourceDir;

fn pytest_sandbox() -> ProcessSandbox {
    let mut request = SandboxRequest::from(&SandboxConfig::default());
    request.timeout = Some(Duration::from_secs(120));
    ProcessSandbox::new(request)
}

/// Verifies that pytest is importable by the default runner command.
#[test]
#[ignore]
fn pytest_available() {
    let output = Command::new("python3")
        .args(["-m", "pytest", "--version"])
        .output()
        .expect("python3 should be on PATH");
    assert!(
        output.status.success(),
        "pytest not importable: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Generated scaffolds for a typed module import the module and pass.
#[test]
#[ignore]
fn generated_scaffold_passes_under_pytest() {
    let dir = SourceDir::new();
    let path = dir.write(
        "calc.py",
        "\
def add(a: int, b: int) -> int:
    return a + b


def greet(name: str = \"World\") -> str:
    return f\"Hello, {name}\"


def reset(flag: bool) -> None:
    return None


def tally(items: list, weights: dict, *, scale: float = 1.0) -> float:
    return len(items) * scale
",
    );
    let sandbox = pytest_sandbox();
    let pipeline = GenerationPipeline::new(PipelineOptions {
        fixtures: vec!["database".to_string()],
        ..PipelineOptions::new(dir.path().join("tests"))
    })
    .with_sandbox(&sandbox);

    let result = pipeline.run(&Target::file(&path));

    assert!(result.success, "errors: {:?}", result.errors);
    let verdict = result.verdict.expect("pytest ran");
    assert!(
        verdict.passed,
        "pytest failed:\n{}\n{}",
        verdict.stdout, verdict.stderr
    );
    assert!(verdict.stdout.contains("test_add_basic PASSED"));
    assert!(verdict.stdout.contains("test_tally_edge_cases PASSED"));
}

/// A trivially false assertion is a fail verdict with pytest's exit code 1.
#[test]
#[ignore]
fn failing_assertion_is_fail_verdict() {
    let verdict = pytest_sandbox()
        .run_isolated("def test_always_fails():\n    assert 1 == 2\n", None)
        .expect("pytest launches");

    assert!(!verdict.passed);
    assert_eq!(verdict.exit_code, Some(1));
    assert!(verdict.stdout.contains("1 failed"));
}

/// A file with no tests makes pytest exit with code 5 (no tests collected).
#[test]
#[ignore]
fn empty_test_file_is_fail_verdict() {
    let verdict = pytest_sandbox()
        .run_isolated("import pytest\n", None)
        .expect("pytest launches");

    assert!(!verdict.passed);
    assert_eq!(verdict.exit_code, Some(5));
}
