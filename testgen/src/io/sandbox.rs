//! Out-of-process test execution in a disposable working directory.

use std::env::JoinPathsError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::config::SandboxConfig;
use super::process::{CommandOutput, ProcessError, run_command_with_timeout};
use crate::core::types::ExecutionVerdict;
use crate::error::SandboxLaunchError;

/// File name the candidate source is materialized under.
pub const SANDBOX_TEST_FILE: &str = "test_sandbox.py";

const SANDBOX_PREFIX: &str = "testgen-sandbox-";

/// Runs candidate test source and reports a verdict.
///
/// A failing test run is an `Ok` fail verdict; `Err` means the runner could
/// not be invoked at all.
pub trait Sandbox {
    /// Execute `test_source` in a fresh working directory that is removed
    /// before returning. `import_root` is put on the child's import path so
    /// the generated `from <module> import *` resolves.
    fn run_isolated(
        &self,
        test_source: &str,
        import_root: Option<&Path>,
    ) -> Result<ExecutionVerdict, SandboxLaunchError>;
}

#[derive(Debug, Clone)]
pub struct SandboxRequest {
    /// Runner argv; the test file is appended as the final argument.
    pub command: Vec<String>,
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
    /// Parent for sandbox directories; the system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl From<&SandboxConfig> for SandboxRequest {
    fn from(cfg: &SandboxConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            timeout: Some(cfg.timeout()),
            output_limit_bytes: cfg.output_limit_bytes,
            scratch_root: None,
        }
    }
}

/// Sandbox backed by an external runner process (pytest by default).
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    request: SandboxRequest,
}

impl ProcessSandbox {
    pub fn new(request: SandboxRequest) -> Self {
        Self { request }
    }

    /// Run the configured runner against an existing test file or directory
    /// in the current working directory. Nothing is copied or cleaned up.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn run_path(&self, path: &Path) -> Result<ExecutionVerdict, SandboxLaunchError> {
        let cmd = self.command(path.as_os_str().to_os_string(), None)?;
        self.execute(cmd)
    }

    fn command(
        &self,
        test_file: OsString,
        import_root: Option<&Path>,
    ) -> Result<Command, SandboxLaunchError> {
        let (program, args) = self
            .request
            .command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or(SandboxLaunchError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args).arg(test_file);
        cmd.env("PYTHONDONTWRITEBYTECODE", "1");
        if let Some(root) = import_root {
            let path = python_path(root, std::env::var_os("PYTHONPATH")).map_err(|err| {
                SandboxLaunchError::Io {
                    context: "build PYTHONPATH",
                    source: std::io::Error::other(err),
                }
            })?;
            cmd.env("PYTHONPATH", path);
        }
        Ok(cmd)
    }

    fn execute(&self, cmd: Command) -> Result<ExecutionVerdict, SandboxLaunchError> {
        let output = run_command_with_timeout(
            cmd,
            None,
            self.request.timeout,
            self.request.output_limit_bytes,
        )
        .map_err(launch_error)?;

        if output.timed_out {
            return Err(SandboxLaunchError::TimedOut {
                timeout: self.request.timeout.unwrap_or_default(),
            });
        }
        Ok(verdict(&output))
    }

    fn create_workspace(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SANDBOX_PREFIX);
        match &self.request.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

impl Sandbox for ProcessSandbox {
    #[instrument(skip_all, fields(bytes = test_source.len()))]
    fn run_isolated(
        &self,
        test_source: &str,
        import_root: Option<&Path>,
    ) -> Result<ExecutionVerdict, SandboxLaunchError> {
        // Validate before touching the filesystem.
        let mut cmd = self.command(SANDBOX_TEST_FILE.into(), import_root)?;

        // Dropping the TempDir removes it on every return path below.
        let workspace = self.create_workspace().map_err(SandboxLaunchError::Workspace)?;
        debug!(workspace = %workspace.path().display(), "created sandbox workspace");

        fs::write(workspace.path().join(SANDBOX_TEST_FILE), test_source).map_err(|source| {
            SandboxLaunchError::Io {
                context: "write sandbox test file",
                source,
            }
        })?;
        cmd.current_dir(workspace.path());

        let result = self.execute(cmd);

        let workspace_path = workspace.path().to_path_buf();
        if let Err(err) = workspace.close() {
            warn!(workspace = %workspace_path.display(), err = %err, "failed to remove sandbox workspace");
        }

        if let Ok(verdict) = &result {
            info!(passed = verdict.passed, exit_code = ?verdict.exit_code, "sandbox run finished");
        }
        result
    }
}

/// `root` followed by the entries of the inherited `PYTHONPATH`, if any.
fn python_path(root: &Path, inherited: Option<OsString>) -> Result<OsString, JoinPathsError> {
    let inherited: Vec<PathBuf> = inherited
        .as_deref()
        .map(|value| {
            std::env::split_paths(value)
                .filter(|entry| !entry.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    std::env::join_paths(std::iter::once(root.to_path_buf()).chain(inherited))
}

fn verdict(output: &CommandOutput) -> ExecutionVerdict {
    ExecutionVerdict::from_exit(output.status.code(), output.stdout_text(), output.stderr_text())
}

fn launch_error(err: ProcessError) -> SandboxLaunchError {
    match err {
        ProcessError::Spawn { program, source } => SandboxLaunchError::Spawn { program, source },
        ProcessError::Io { context, source } => SandboxLaunchError::Io { context, source },
        other => SandboxLaunchError::Io {
            context: "collect runner output",
            source: std::io::Error::other(other.to_string()),
        },
    }
}
