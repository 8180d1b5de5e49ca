//! Generator configuration stored under `.testgen/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::render::GeneratorOptions;

/// Generator configuration (TOML).
///
/// Edited by humans; missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestgenConfig {
    /// Output directory for generated test files, relative to the project root.
    pub test_dir: PathBuf,

    /// Render the edge-case scaffold for functions with annotated parameters.
    pub include_edge_cases: bool,

    /// Generate tests for underscore-prefixed functions too.
    pub include_private: bool,

    /// Emit `from <module> import *` after the pytest import.
    pub import_module: bool,

    /// Run the generated file through the sandbox before writing it.
    pub validate: bool,

    /// Minimum judge score counted as a pass when the judge omits `passed`.
    pub validation_threshold: f64,

    /// Dependency names rendered as fixture stubs into every generated file.
    pub fixtures: Vec<String>,

    pub sandbox: SandboxConfig,
    pub enhancer: HookConfig,
    pub judge: HookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Runner argv; the test file path is appended as the last argument.
    pub command: Vec<String>,

    /// Wall-clock bound for one runner invocation.
    pub timeout_secs: u64,

    /// Truncate runner stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: [
                "python3",
                "-m",
                "pytest",
                "-v",
                "--tb=short",
                "-p",
                "no:cacheprovider",
            ]
            .map(str::to_string)
            .to_vec(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External command hook. An empty `command` disables the hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HookConfig {
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl HookConfig {
    fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            command: Vec::new(),
            timeout_secs,
        }
    }

    pub fn enabled(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self::with_timeout(120)
    }
}

impl Default for TestgenConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests"),
            include_edge_cases: true,
            include_private: false,
            import_module: true,
            validate: true,
            validation_threshold: 7.0,
            fixtures: Vec::new(),
            sandbox: SandboxConfig::default(),
            enhancer: HookConfig::with_timeout(300),
            judge: HookConfig::with_timeout(120),
        }
    }
}

impl TestgenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.test_dir.as_os_str().is_empty() {
            return Err(anyhow!("test_dir must not be empty"));
        }
        if !(0.0..=10.0).contains(&self.validation_threshold) {
            return Err(anyhow!("validation_threshold must be within 0..=10"));
        }
        if self.sandbox.command.is_empty() || self.sandbox.command[0].trim().is_empty() {
            return Err(anyhow!("sandbox.command must be a non-empty array"));
        }
        if self.sandbox.timeout_secs == 0 {
            return Err(anyhow!("sandbox.timeout_secs must be > 0"));
        }
        if self.sandbox.output_limit_bytes == 0 {
            return Err(anyhow!("sandbox.output_limit_bytes must be > 0"));
        }
        for (name, hook) in [("enhancer", &self.enhancer), ("judge", &self.judge)] {
            if hook.enabled() && hook.command[0].trim().is_empty() {
                return Err(anyhow!("{name}.command must start with a program"));
            }
            if hook.timeout_secs == 0 {
                return Err(anyhow!("{name}.timeout_secs must be > 0"));
            }
        }
        Ok(())
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            include_edge_cases: self.include_edge_cases,
            include_private: self.include_private,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TestgenConfig::default()`.
pub fn load_config(path: &Path) -> Result<TestgenConfig> {
    if !path.exists() {
        let cfg = TestgenConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TestgenConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &TestgenConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
