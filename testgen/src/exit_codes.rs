//! Stable exit codes for testgen CLI commands.

/// Command succeeded (generated tests passed validation or validation was skipped).
pub const OK: i32 = 0;
/// Command failed: invalid config, unreadable or unparsable source, unit not found, ...
pub const FAILED: i32 = 1;
/// Tests were generated and written but the runner reported failures.
pub const VALIDATION_FAILED: i32 = 2;
