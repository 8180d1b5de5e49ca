//! Orchestration for a single `testgen generate` target.
//!
//! One invocation walks `Parsing -> Filtering -> Rendering -> Validating ->
//! Writing -> Done`; any stage may divert to `Failed`. A failing sandbox
//! verdict is recorded and does not stop the file from being written.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::analyzer::{parse_module, source_segment};
use crate::core::render::{
    GeneratorOptions, TestCodeGenerator, generate_fixtures, render_test_file, unique_stems,
};
use crate::core::target::Target;
use crate::core::types::{FunctionSignature, GeneratedTest, GenerationResult, Module, module_stem};
use crate::error::GenerationError;
use crate::io::config::TestgenConfig;
use crate::io::enhancer::{Enhancer, test_function_names};
use crate::io::judge::{Judge, judge_or_neutral};
use crate::io::sandbox::Sandbox;
use crate::io::source::read_source;

/// Pipeline stage, used for tracing and failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsing,
    Filtering,
    Rendering,
    Validating,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Filtering => "filtering",
            Stage::Rendering => "rendering",
            Stage::Validating => "validating",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Directory receiving `test_<stem>.py`; created when absent.
    pub output_dir: PathBuf,
    pub generator: GeneratorOptions,
    /// Emit `from <module> import *` in the generated file.
    pub import_module: bool,
    /// Run the rendered file through the sandbox.
    pub validate: bool,
    /// Dependency names rendered as fixture stubs.
    pub fixtures: Vec<String>,
}

impl PipelineOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            generator: GeneratorOptions::default(),
            import_module: true,
            validate: true,
            fixtures: Vec::new(),
        }
    }

    pub fn from_config(cfg: &TestgenConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            generator: cfg.generator_options(),
            import_module: cfg.import_module,
            validate: cfg.validate,
            fixtures: cfg.fixtures.clone(),
        }
    }
}

/// Sequences analysis, rendering, validation, and file emission for one target.
///
/// Collaborators are borrowed trait objects so callers can plug in real
/// processes or scripted fakes.
pub struct GenerationPipeline<'a> {
    options: PipelineOptions,
    generator: TestCodeGenerator,
    sandbox: Option<&'a dyn Sandbox>,
    enhancer: Option<&'a dyn Enhancer>,
    judge: Option<&'a dyn Judge>,
}

/// State threaded through one invocation.
struct Run {
    stage: Stage,
    result: GenerationResult,
}

impl Run {
    fn advance(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }
}

impl<'a> GenerationPipeline<'a> {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            generator: TestCodeGenerator::new(options.generator),
            options,
            sandbox: None,
            enhancer: None,
            judge: None,
        }
    }

    pub fn with_sandbox(mut self, sandbox: &'a dyn Sandbox) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_enhancer(mut self, enhancer: &'a dyn Enhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_judge(mut self, judge: &'a dyn Judge) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Deterministic output file for `source`: `<output_dir>/test_<stem>.py`.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = module_stem(source).unwrap_or("module");
        self.options.output_dir.join(format!("test_{stem}.py"))
    }

    /// Run every stage for `target`. Never returns an error: failures land in
    /// [`GenerationResult::errors`] so batch callers can continue.
    #[instrument(skip_all, fields(target = %target))]
    pub fn run(&self, target: &Target) -> GenerationResult {
        let mut run = Run {
            stage: Stage::Parsing,
            result: GenerationResult::default(),
        };
        match self.execute(target, &mut run) {
            Ok(()) => {
                run.advance(Stage::Done);
                run.result.success = true;
                info!(
                    tests = run.result.tests.len(),
                    file = ?run.result.test_file,
                    validation_failed = run.result.validation_failed(),
                    "generation finished"
                );
                run.result
            }
            Err(err) => {
                warn!(stage = %run.stage, err = %err, "generation failed");
                run.advance(Stage::Failed);
                let mut failed = GenerationResult::failed(err);
                failed.warnings = run.result.warnings;
                failed
            }
        }
    }

    fn execute(&self, target: &Target, run: &mut Run) -> Result<(), GenerationError> {
        let source = read_source(&target.path)?;
        let module = parse_module(&target.path, &source)?;
        if module.is_empty() {
            return Err(GenerationError::NoTestableUnits {
                path: target.path.clone(),
            });
        }

        run.advance(Stage::Filtering);
        let candidates = select_units(&module, target.unit.as_deref());
        if let Some(unit) = &target.unit
            && candidates.is_empty()
        {
            return Err(GenerationError::UnitNotFound {
                unit: unit.clone(),
                path: target.path.clone(),
            });
        }

        run.advance(Stage::Rendering);
        let tests: Vec<GeneratedTest> = candidates
            .into_iter()
            .filter_map(|(signature, stem)| self.render_unit(signature, &stem, &source, run))
            .collect();
        if tests.is_empty() {
            info!("no eligible units after visibility filtering; nothing to write");
            return Ok(());
        }

        let module_name = self.options.import_module.then(|| module.stem()).flatten();
        let fixtures = generate_fixtures(&self.options.fixtures);
        let file_text = render_test_file(module_name, &fixtures, &tests);
        run.result.tests = tests.into_iter().map(|t| t.source).collect();

        run.advance(Stage::Validating);
        self.validate(&file_text, &target.path, run);

        run.advance(Stage::Writing);
        let output = self.output_path(&target.path);
        write_test_file(&output, &file_text)?;
        run.result.test_file = Some(output);
        Ok(())
    }

    /// Template render, optionally replaced by the enhancer's output.
    fn render_unit(
        &self,
        signature: &FunctionSignature,
        stem: &str,
        source: &str,
        run: &mut Run,
    ) -> Option<GeneratedTest> {
        let draft = self.generator.generate_as(signature, stem)?;
        let Some(enhancer) = self.enhancer else {
            return Some(draft);
        };

        let unit_source = source_segment(source, signature.lines);
        match enhancer.enhance(signature, &unit_source, &draft.source) {
            Ok(code) => Some(GeneratedTest {
                target: draft.target,
                test_names: test_function_names(&code),
                source: code,
            }),
            Err(err) => {
                warn!(unit = %signature.name, err = %err, "enhancer failed, keeping template output");
                run.result
                    .warnings
                    .push(format!("enhancer failed for {}: {err}", signature.name));
                Some(draft)
            }
        }
    }

    fn validate(&self, file_text: &str, source_path: &Path, run: &mut Run) {
        if self.options.validate {
            match self.sandbox {
                Some(sandbox) => {
                    let import_root = import_root(source_path);
                    match sandbox.run_isolated(file_text, import_root.as_deref()) {
                        Ok(verdict) => {
                            if !verdict.passed {
                                warn!(exit_code = ?verdict.exit_code, "generated tests failed validation");
                            }
                            run.result.verdict = Some(verdict);
                        }
                        Err(err) => {
                            warn!(err = %err, "sandbox could not run; validation skipped");
                            run.result
                                .warnings
                                .push(format!("validation skipped: {err}"));
                        }
                    }
                }
                None => debug!("no sandbox configured; validation skipped"),
            }
        }
        run.result.judgment = Some(judge_or_neutral(self.judge, file_text));
    }
}

/// Functions to render paired with their test-name stems.
///
/// Stems are assigned over the whole module so a unit filter never changes
/// the names of the tests it keeps.
fn select_units<'m>(module: &'m Module, unit: Option<&str>) -> Vec<(&'m FunctionSignature, String)> {
    let stems = unique_stems(
        module
            .functions
            .iter()
            .map(|f| (f.name.as_str(), f.lines.start)),
    );
    module
        .functions
        .iter()
        .zip(stems)
        .filter(|(f, _)| unit.is_none_or(|u| f.name == u))
        .collect()
}

/// Absolute directory holding `source_path`, put on the runner's import path.
fn import_root(source_path: &Path) -> Option<PathBuf> {
    let dir = source_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::path::absolute(dir).ok()
}

fn write_test_file(path: &Path, contents: &str) -> Result<(), GenerationError> {
    let write_err = |source| GenerationError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote test file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ExecutionVerdict, Judgment};
    use crate::test_support::{ScriptedEnhancer, ScriptedJudge, ScriptedSandbox, SourceDir};

    const CALC: &str = "\
def add(a: int, b: int) -> int:
    return a + b


def _helper(x):
    return x
";

    fn options(dir: &SourceDir) -> PipelineOptions {
        PipelineOptions::new(dir.path().join("out"))
    }

    #[test]
    fn generates_and_writes_file_for_public_units() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let pipeline = GenerationPipeline::new(options(&dir));

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.tests.len(), 1);
        let file = result.test_file.expect("test file");
        assert_eq!(file, dir.path().join("out").join("test_calc.py"));
        let written = fs::read_to_string(&file).expect("read");
        assert!(written.starts_with("import pytest\nfrom calc import *\n\n"));
        assert!(written.contains("def test_add_basic():"));
        assert!(!written.contains("_helper"));
        assert_eq!(result.verdict, None);
        assert_eq!(result.judgment.map(|j| j.passed), Some(true));
    }

    #[test]
    fn private_only_module_succeeds_with_empty_output() {
        let dir = SourceDir::new();
        let path = dir.write("hidden.py", "def _secret():\n    return 1\n");
        let pipeline = GenerationPipeline::new(options(&dir));

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success);
        assert!(result.tests.is_empty());
        assert_eq!(result.test_file, None);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn syntax_error_fails_with_analyzer_message() {
        let dir = SourceDir::new();
        let path = dir.write("broken.py", "def broken(:\n    pass\n");
        let pipeline = GenerationPipeline::new(options(&dir));

        let result = pipeline.run(&Target::file(&path));

        assert!(!result.success);
        assert!(result.tests.is_empty());
        assert!(result.errors[0].contains("syntax error"));
    }

    #[test]
    fn failing_verdict_is_recorded_and_file_still_written() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let sandbox = ScriptedSandbox::verdicts(vec![ExecutionVerdict::from_exit(
            Some(1),
            "1 failed".to_string(),
            String::new(),
        )]);
        let pipeline = GenerationPipeline::new(options(&dir)).with_sandbox(&sandbox);

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success);
        assert!(result.validation_failed());
        assert!(result.test_file.expect("file").exists());
        let calls = sandbox.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].source.contains("def test_add_basic():"));
        assert_eq!(
            calls[0].import_root.as_deref(),
            Some(std::path::absolute(dir.path()).expect("abs").as_path())
        );
    }

    #[test]
    fn sandbox_launch_failure_becomes_warning() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let sandbox = ScriptedSandbox::launch_failure();
        let pipeline = GenerationPipeline::new(options(&dir)).with_sandbox(&sandbox);

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success);
        assert_eq!(result.verdict, None);
        assert!(result.warnings[0].starts_with("validation skipped"));
        assert!(result.test_file.is_some());
    }

    #[test]
    fn validation_disabled_skips_sandbox() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let sandbox = ScriptedSandbox::passing();
        let pipeline = GenerationPipeline::new(PipelineOptions {
            validate: false,
            ..options(&dir)
        })
        .with_sandbox(&sandbox);

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success);
        assert!(sandbox.calls().is_empty());
    }

    #[test]
    fn enhancer_output_replaces_template() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let enhancer = ScriptedEnhancer::returning("def test_add_sums():\n    assert add(2, 3) == 5\n");
        let pipeline = GenerationPipeline::new(options(&dir)).with_enhancer(&enhancer);

        let result = pipeline.run(&Target::file(&path));

        assert_eq!(result.tests, vec!["def test_add_sums():\n    assert add(2, 3) == 5\n"]);
        let seen = enhancer.calls();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "add");
        assert_eq!(seen[0].1, "def add(a: int, b: int) -> int:\n    return a + b");
    }

    #[test]
    fn enhancer_failure_falls_back_to_template() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let enhancer = ScriptedEnhancer::failing();
        let pipeline = GenerationPipeline::new(options(&dir)).with_enhancer(&enhancer);

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success);
        assert!(result.errors.is_empty());
        assert!(result.tests[0].contains("def test_add_basic():"));
        assert!(result.warnings[0].contains("enhancer failed for add"));
    }

    #[test]
    fn judge_verdict_is_attached() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let judge = ScriptedJudge::returning(Judgment {
            score: 8.0,
            passed: true,
            feedback: "fine".to_string(),
        });
        let pipeline = GenerationPipeline::new(options(&dir)).with_judge(&judge);

        let result = pipeline.run(&Target::file(&path));

        assert_eq!(result.judgment.map(|j| j.score), Some(8.0));
        assert!(judge.calls()[0].starts_with("import pytest\n"));
    }

    #[test]
    fn failing_judge_degrades_to_neutral_judgment() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let judge = ScriptedJudge::failing();
        let pipeline = GenerationPipeline::new(options(&dir)).with_judge(&judge);

        let result = pipeline.run(&Target::file(&path));

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(judge.calls().len(), 1);
        let judgment = result.judgment.expect("judgment");
        assert_eq!(judgment.score, crate::io::judge::NEUTRAL_SCORE);
        assert!(judgment.passed);
        assert!(judgment.feedback.starts_with("quality judge unavailable"));
        assert!(result.test_file.is_some());
    }

    #[test]
    fn duplicate_definitions_get_distinct_tests() {
        let dir = SourceDir::new();
        let path = dir.write(
            "dup.py",
            "def f():\n    return 1\n\n\ndef f():\n    return 2\n",
        );
        let pipeline = GenerationPipeline::new(options(&dir));

        let result = pipeline.run(&Target::file(&path));

        assert_eq!(result.tests.len(), 2);
        assert!(result.tests[0].contains("def test_f_basic():"));
        assert!(result.tests[1].contains("def test_f_line5_basic():"));
    }

    #[test]
    fn unit_filter_keeps_stable_names() {
        let dir = SourceDir::new();
        let path = dir.write(
            "dup.py",
            "def f():\n    return 1\n\n\ndef f():\n    return 2\n\n\ndef g():\n    pass\n",
        );
        let pipeline = GenerationPipeline::new(options(&dir));

        let result = pipeline.run(&Target::unit(&path, "f"));

        assert_eq!(result.tests.len(), 2);
        assert!(result.tests.iter().all(|t| !t.contains("test_g")));
    }

    #[test]
    fn configured_fixtures_are_written() {
        let dir = SourceDir::new();
        let path = dir.write("calc.py", CALC);
        let pipeline = GenerationPipeline::new(PipelineOptions {
            fixtures: vec!["db".to_string()],
            import_module: false,
            ..options(&dir)
        });

        let result = pipeline.run(&Target::file(&path));

        let written = fs::read_to_string(result.test_file.expect("file")).expect("read");
        assert!(written.starts_with("import pytest\n\n@pytest.fixture\ndef db_fixture():"));
    }

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Validating.to_string(), "validating");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
