//! CLI module
//!
//! Command-line interface for planning and validating extractions.
//!
//! # Commands
//!
//! - `plan` - Print the partitions a read would run, newest first
//! - `validate` - Validate an extraction config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
