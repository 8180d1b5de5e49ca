//! I/O helpers for testgen commands.

pub mod config;
pub mod enhancer;
pub mod hook;
pub mod init;
pub mod judge;
pub mod process;
pub mod sandbox;
pub mod source;
