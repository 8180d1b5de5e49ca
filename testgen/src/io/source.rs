//! Reading Python source files from disk.

use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use crate::core::analyzer::{find_unit_span, parse_module, source_segment};
use crate::core::types::Module;
use crate::error::AnalyzeError;

pub fn read_source(path: &Path) -> Result<String, AnalyzeError> {
    fs::read_to_string(path).map_err(|source| AnalyzeError::SourceRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and analyze one source file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn analyze(path: &Path) -> Result<Module, AnalyzeError> {
    let source = read_source(path)?;
    let module = parse_module(path, &source)?;
    debug!(
        functions = module.functions.len(),
        classes = module.classes.len(),
        imports = module.imports.len(),
        "analyzed module"
    );
    Ok(module)
}

/// Source text of the first function or method named `name`, decorators
/// excluded. `Ok(None)` when the file has no such unit.
pub fn extract_source_code(path: &Path, name: &str) -> Result<Option<String>, AnalyzeError> {
    let source = read_source(path)?;
    let module = parse_module(path, &source)?;
    Ok(find_unit_span(&module, name).map(|span| source_segment(&source, span)))
}
