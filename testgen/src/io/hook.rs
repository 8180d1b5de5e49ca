//! Shared invocation of external hook commands (enhancer, judge).

use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument};

use super::process::run_command_with_timeout;
use crate::error::HookError;

/// Hook output beyond this is dropped; hooks answer with one file or one JSON object.
pub const HOOK_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

#[derive(Debug, Clone)]
pub struct HookCommand {
    pub argv: Vec<String>,
    pub timeout: Duration,
}

impl HookCommand {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    /// Pipe `input` to the command and return its stdout on exit status 0.
    #[instrument(skip_all, fields(program = self.argv.first().map(String::as_str).unwrap_or_default()))]
    pub fn run(&self, input: &str) -> Result<String, HookError> {
        let (program, args) = self
            .argv
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or(HookError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        let output = run_command_with_timeout(
            cmd,
            Some(input.as_bytes()),
            Some(self.timeout),
            HOOK_OUTPUT_LIMIT_BYTES,
        )?;

        if output.timed_out {
            return Err(HookError::TimedOut {
                timeout: self.timeout,
            });
        }
        if !output.status.success() {
            debug!(stderr = %output.stderr_text(), "hook failed");
            return Err(HookError::Failed {
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
