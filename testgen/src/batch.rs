//! Directory targets: one pipeline invocation per Python source file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::target::Target;
use crate::core::types::GenerationResult;
use crate::pipeline::GenerationPipeline;

/// Per-file outcomes of a directory run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(PathBuf, GenerationResult)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Files generated whose sandbox verdict did not pass.
    pub fn validation_failed(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| r.success && r.validation_failed())
            .count()
    }

    pub fn total_tests(&self) -> usize {
        self.results.iter().map(|(_, r)| r.tests.len()).sum()
    }
}

/// Python sources under `root` that are not themselves tests, sorted.
///
/// Hidden directories and `__pycache__` are skipped, as are `test_*.py`,
/// `*_test.py`, and `conftest.py`.
pub fn collect_sources(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(err = %err, "skipping unreadable path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .map(DirEntry::into_path)
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "__pycache__"
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name.strip_suffix(".py") else {
        return false;
    };
    !(stem.starts_with("test_") || stem.ends_with("_test") || stem == "conftest")
}

/// Run `pipeline` over every source under `root`, sequentially.
///
/// A failing file never aborts the batch. When two sources map to the same
/// output file the later one wins; the collision is logged and recorded as a
/// warning on the later result.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_batch(pipeline: &GenerationPipeline<'_>, root: &Path) -> BatchReport {
    let mut report = BatchReport::default();
    let mut outputs: HashMap<PathBuf, PathBuf> = HashMap::new();

    for source in collect_sources(root) {
        let mut result = pipeline.run(&Target::file(&source));
        if let Some(output) = &result.test_file
            && let Some(previous) = outputs.insert(output.clone(), source.clone())
        {
            warn!(
                output = %output.display(),
                previous = %previous.display(),
                source = %source.display(),
                "output path collision; last writer wins"
            );
            result.warnings.push(format!(
                "overwrote {} previously generated from {}",
                output.display(),
                previous.display()
            ));
        }
        report.results.push((source, result));
    }

    info!(
        files = report.results.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}
