//! Library interface for the cirrus CLI
//!
//! The engine crates work on bytes and values only; this crate supplies the
//! collaborators around them: reading files, the `cirrus.toml` project file
//! and rendering results.

pub mod commands;
pub mod config;
pub mod loader;
pub mod output;

pub use config::{Overrides, ProjectConfig, PROJECT_FILE};
pub use output::Format;
