//! Generation targets of the form `path` or `path::unit`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    /// Restrict generation to functions with this name.
    pub unit: Option<String>,
}

impl Target {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            unit: None,
        }
    }

    pub fn unit(path: impl Into<PathBuf>, unit: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            unit: Some(unit.into()),
        }
    }

    /// Split on the first `::`. An empty unit means no filter.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once("::") {
            Some((path, unit)) if !unit.trim().is_empty() => Self::unit(path, unit.trim()),
            Some((path, _)) => Self::file(path),
            None => Self::file(raw),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}::{unit}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}
