//! Python test scaffold generator.
//!
//! Analyzes Python modules, synthesizes sample arguments, renders pytest
//! scaffolds, and validates them in a throwaway sandbox. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (analysis over in-memory source,
//!   type labels, sample values, rendering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, file reads, child
//!   processes, external hooks). Isolated behind traits to enable fakes in tests.
//!
//! Orchestration modules ([`pipeline`], [`batch`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod batch;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
