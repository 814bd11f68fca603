//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Partitioned table extraction planner
#[derive(Parser, Debug)]
#[command(name = "rowharvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Extraction config file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the date partitions of a range, newest first
    Plan {
        /// Range start (overrides the config's created.start)
        #[arg(long)]
        start: Option<String>,

        /// Range end, exclusive (overrides the config's created.end)
        #[arg(long)]
        end: Option<String>,

        /// Partition interval: minute, five_minute, hour, day, week, month, quarter, year
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Validate an extraction config
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
