//! Initialization helpers for `.testgen/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{TestgenConfig, load_config, write_config};

/// Canonical paths within `.testgen/` for a project root.
#[derive(Debug, Clone)]
pub struct TestgenPaths {
    pub root: PathBuf,
    pub testgen_dir: PathBuf,
    pub config_path: PathBuf,
    pub gitignore_path: PathBuf,
}

impl TestgenPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let testgen_dir = root.join(".testgen");
        Self {
            root,
            config_path: testgen_dir.join("config.toml"),
            gitignore_path: testgen_dir.join(".gitignore"),
            testgen_dir,
        }
    }

    /// Load the project config, falling back to defaults when absent.
    pub fn load_config(&self) -> Result<TestgenConfig> {
        load_config(&self.config_path)
    }

    /// Configured output directory resolved against the project root.
    pub fn test_dir(&self, cfg: &TestgenConfig) -> PathBuf {
        self.root.join(&cfg.test_dir)
    }
}

/// Options for `init_project`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config with defaults.
    pub force: bool,
}

/// Create `.testgen/` scaffolding in `root`.
///
/// Fails if `.testgen/config.toml` already exists unless `options.force` is set.
pub fn init_project(root: &Path, options: &InitOptions) -> Result<TestgenPaths> {
    let paths = TestgenPaths::new(root);
    if paths.testgen_dir.exists() && !paths.testgen_dir.is_dir() {
        return Err(anyhow!("testgen init: .testgen exists but is not a directory"));
    }
    if paths.config_path.exists() && !options.force {
        return Err(anyhow!(
            "testgen init: {} already exists (use --force to overwrite)",
            paths.config_path.display()
        ));
    }

    fs::create_dir_all(&paths.testgen_dir)
        .with_context(|| format!("create directory {}", paths.testgen_dir.display()))?;
    write_config(&paths.config_path, &TestgenConfig::default())?;
    fs::write(&paths.gitignore_path, TESTGEN_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;

    Ok(paths)
}

const TESTGEN_GITIGNORE: &str = "*.tmp\n";
