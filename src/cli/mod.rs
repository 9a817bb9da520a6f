//! CLI command handlers
//!
//! Argument parsing, subcommand implementations and routing between them.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{get_log_level, Cli, Commands};
pub use router::execute_command;
