//! Investigation tests for behavior of the real pytest runner.
//!
//! These tests are excluded from regular CI runs because they require a
//! Python 3 installation with pytest available as `python3 -m pytest`.
//!
//! Run with: `cargo test --test investigation -- --ignored`

#[path = "investigation/pytest_runner.rs"]
mod pytest_runner;
