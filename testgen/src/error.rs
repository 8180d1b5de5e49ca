//! Error taxonomy for analysis, generation, and sandbox validation.
//!
//! Every variant here is fatal only for the invocation that produced it. Batch
//! callers fold them into [`crate::core::types::GenerationResult::errors`]
//! instead of propagating across files.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while turning a source file into a structural model.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("read source {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in {} at line {line}, column {column}", path.display())]
    SyntaxParse {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("load python grammar: {0}")]
    Grammar(String),
}

/// Failures of a single generation pipeline invocation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error("no testable units in {}", path.display())]
    NoTestableUnits { path: PathBuf },

    #[error("unit not found: '{unit}' in {}", path.display())]
    UnitNotFound { unit: String, path: PathBuf },

    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The test runner could not be invoked (as opposed to running and failing).
#[derive(Debug, Error)]
pub enum SandboxLaunchError {
    #[error("runner command is empty")]
    EmptyCommand,

    #[error("prepare sandbox workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("runner exceeded wall-clock bound of {timeout:?}")]
    TimedOut { timeout: Duration },
}

/// Failures of the optional external collaborators (enhancer, judge).
///
/// These are logged and swallowed: callers fall back to deterministic behavior.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook command is empty")]
    EmptyCommand,

    #[error("run hook: {0}")]
    Process(#[from] crate::io::process::ProcessError),

    #[error("hook timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("hook exited with status {code:?}")]
    Failed { code: Option<i32> },

    #[error("hook output rejected: {0}")]
    InvalidOutput(String),

    #[error("render hook prompt: {0}")]
    Prompt(#[from] minijinja::Error),
}
