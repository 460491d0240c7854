//! CLI layer for quest-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! asking research questions, inspecting key slots and exporting prompts.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
