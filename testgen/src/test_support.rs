//! Test-only fakes for the pipeline's collaborators and a scratch source tree.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::types::{ExecutionVerdict, FunctionSignature, Judgment};
use crate::error::{HookError, SandboxLaunchError};
use crate::io::enhancer::Enhancer;
use crate::io::judge::Judge;
use crate::io::sandbox::Sandbox;

/// Temporary directory for writing Python fixtures.
pub struct SourceDir {
    dir: TempDir,
}

impl SourceDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create source tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create source parent");
        }
        fs::write(&path, contents).expect("write source file");
        path
    }
}

impl Default for SourceDir {
    fn default() -> Self {
        Self::new()
    }
}

/// One recorded [`Sandbox::run_isolated`] call.
#[derive(Debug, Clone)]
pub struct SandboxCall {
    pub source: String,
    pub import_root: Option<PathBuf>,
}

/// Sandbox returning queued verdicts (then passing ones) without spawning anything.
pub struct ScriptedSandbox {
    verdicts: RefCell<VecDeque<ExecutionVerdict>>,
    launch_fails: bool,
    calls: RefCell<Vec<SandboxCall>>,
}

impl ScriptedSandbox {
    pub fn passing() -> Self {
        Self::verdicts(Vec::new())
    }

    pub fn verdicts(verdicts: Vec<ExecutionVerdict>) -> Self {
        Self {
            verdicts: RefCell::new(verdicts.into()),
            launch_fails: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every call fails as if the runner executable were missing.
    pub fn launch_failure() -> Self {
        Self {
            launch_fails: true,
            ..Self::passing()
        }
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.calls.borrow().clone()
    }
}

impl Sandbox for ScriptedSandbox {
    fn run_isolated(
        &self,
        test_source: &str,
        import_root: Option<&Path>,
    ) -> Result<ExecutionVerdict, SandboxLaunchError> {
        self.calls.borrow_mut().push(SandboxCall {
            source: test_source.to_string(),
            import_root: import_root.map(Path::to_path_buf),
        });
        if self.launch_fails {
            return Err(SandboxLaunchError::Spawn {
                program: "pytest".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted: not found"),
            });
        }
        Ok(self.verdicts.borrow_mut().pop_front().unwrap_or_else(|| {
            ExecutionVerdict::from_exit(Some(0), "scripted pass".to_string(), String::new())
        }))
    }
}

/// Enhancer returning fixed code, or failing, and recording `(unit, unit source)`.
pub struct ScriptedEnhancer {
    output: Option<String>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedEnhancer {
    pub fn returning(code: &str) -> Self {
        Self {
            output: Some(code.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl Enhancer for ScriptedEnhancer {
    fn enhance(
        &self,
        signature: &FunctionSignature,
        source_text: &str,
        _draft: &str,
    ) -> Result<String, HookError> {
        self.calls
            .borrow_mut()
            .push((signature.name.clone(), source_text.to_string()));
        self.output
            .clone()
            .ok_or_else(|| HookError::InvalidOutput("scripted failure".to_string()))
    }
}

/// Judge returning a fixed judgment, or failing, and recording the judged source.
pub struct ScriptedJudge {
    judgment: Option<Judgment>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedJudge {
    pub fn returning(judgment: Judgment) -> Self {
        Self {
            judgment: Some(judgment),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            judgment: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Judge for ScriptedJudge {
    fn judge(&self, test_source: &str) -> Result<Judgment, HookError> {
        self.calls.borrow_mut().push(test_source.to_string());
        self.judgment
            .clone()
            .ok_or(HookError::Failed { code: Some(1) })
    }
}
