//! Structural model of an analyzed module and the artifacts derived from it.
//!
//! These types are plain values: they never reference the parser tree they
//! were built from and carry no I/O handles, so equal source text always
//! yields equal values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a parameter is bound at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Passed positionally (includes positional-only parameters).
    Positional,
    /// Declared after `*` or `*args`; must be passed as `name=value`.
    KeywordOnly,
}

/// A single declared parameter. The receiver (`self`) is never represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    /// Annotation text exactly as written, e.g. `int` or `list[str]`.
    pub annotation: Option<String>,
    /// Default-value expression exactly as written, e.g. `"World"`.
    pub default: Option<String>,
}

/// 1-based inclusive line range of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// A module-level function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    /// Declaration order; call arguments are synthesized in this order.
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub docstring: Option<String>,
    pub is_private: bool,
    pub decorators: Vec<String>,
    pub lines: LineSpan,
}

impl FunctionSignature {
    pub fn param_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// First non-empty docstring line.
    pub fn summary(&self) -> Option<&str> {
        self.docstring
            .as_deref()
            .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
    }
}

/// Shallow summary of a method; methods are not expanded into full signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub params: Vec<String>,
    pub is_private: bool,
    pub lines: LineSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSignature {
    pub name: String,
    pub docstring: Option<String>,
    pub is_private: bool,
    pub methods: Vec<MethodSummary>,
    pub lines: LineSpan,
}

/// One analyzed source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: PathBuf,
    pub functions: Vec<FunctionSignature>,
    pub classes: Vec<ClassSignature>,
    pub imports: BTreeSet<String>,
}

impl Module {
    /// No functions and no classes: nothing a test could target.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty()
    }

    /// File stem used for the output file name and the module import.
    pub fn stem(&self) -> Option<&str> {
        module_stem(&self.path)
    }
}

pub fn module_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Leading underscore marks a name private (dunder names included).
pub fn is_private_name(name: &str) -> bool {
    name.starts_with('_')
}

/// Rendered test code for one target function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTest {
    /// Name of the function under test.
    pub target: String,
    /// Names of the `def test_*` functions contained in `source`.
    pub test_names: Vec<String>,
    pub source: String,
}

/// Outcome of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionVerdict {
    pub passed: bool,
    /// `None` when the runner was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionVerdict {
    /// Pass is exactly "exit status 0"; everything else is a fail verdict.
    pub fn from_exit(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        Self {
            passed: exit_code == Some(0),
            exit_code,
            stdout,
            stderr,
        }
    }
}

/// Quality judgment produced by an external judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub score: f64,
    pub passed: bool,
    pub feedback: String,
}

/// Terminal artifact of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    /// Rendered test sources in output order.
    pub tests: Vec<String>,
    pub test_file: Option<PathBuf>,
    pub verdict: Option<ExecutionVerdict>,
    pub judgment: Option<Judgment>,
    pub errors: Vec<String>,
    /// Non-fatal problems (validation skipped, hook fell back, ...).
    pub warnings: Vec<String>,
}

impl GenerationResult {
    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            errors: vec![error.to_string()],
            ..Self::default()
        }
    }

    /// Generated, but the sandbox run did not pass.
    pub fn validation_failed(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| !v.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(doc: Option<&str>) -> FunctionSignature {
        FunctionSignature {
            name: "add".to_string(),
            parameters: vec![Parameter {
                name: "a".to_string(),
                kind: ParamKind::Positional,
                annotation: None,
                default: None,
            }],
            return_type: None,
            docstring: doc.map(str::to_string),
            is_private: false,
            decorators: Vec::new(),
            lines: LineSpan { start: 1, end: 2 },
        }
    }

    #[test]
    fn summary_skips_blank_leading_lines() {
        let sig = signature(Some("\n  Add numbers.\n\nMore text."));
        assert_eq!(sig.summary(), Some("Add numbers."));
        assert_eq!(signature(None).summary(), None);
    }

    #[test]
    fn verdict_passes_only_on_zero_exit() {
        assert!(ExecutionVerdict::from_exit(Some(0), String::new(), String::new()).passed);
        assert!(!ExecutionVerdict::from_exit(Some(1), String::new(), String::new()).passed);
        assert!(!ExecutionVerdict::from_exit(None, String::new(), String::new()).passed);
    }

    #[test]
    fn private_names_use_leading_underscore() {
        assert!(is_private_name("_helper"));
        assert!(is_private_name("__init__"));
        assert!(!is_private_name("public_api"));
    }
}
