//! Deterministic, pure logic shared by the generator.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! source text and data structures and return deterministic outputs suitable
//! for tests.

pub mod analyzer;
pub mod render;
pub mod resolve;
pub mod synth;
pub mod target;
pub mod types;
