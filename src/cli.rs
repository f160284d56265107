//! Command-line interface definitions for blockdedupe.
//!
//! Global options control logging, error format and the configuration file;
//! subcommands select the operation.
//!
//! # Example
//!
//! ```bash
//! # List whole-file duplicates
//! blockdedupe duplicates whole.sums
//!
//! # Full sub-file analysis, pretty JSON report
//! blockdedupe analyze whole.sums blocks.sums --pretty
//!
//! # Flattened CSV report, keep single-file components
//! blockdedupe analyze whole.sums blocks.sums -o csv --no-singleton-filter
//!
//! # Debug logging
//! blockdedupe -v analyze whole.sums blocks.sums
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Sub-file deduplication planner.
///
/// Reads whole-file and per-block checksum listings and groups files by the
/// content blocks they share, splitting groups wherever two different blocks
/// claim the same byte range.
#[derive(Debug, Parser)]
#[command(name = "blockdedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report failures as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "PATH", env = "BLOCKDEDUPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List sets of files whose whole content is identical
    Duplicates(DuplicatesArgs),
    /// Group files by shared content blocks
    Analyze(AnalyzeArgs),
}

/// Arguments for the duplicates subcommand.
#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    /// Whole-file checksum listing (`<hash> <file>` per line)
    #[arg(value_name = "WHOLE_CHECKSUMS")]
    pub whole_checksums: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: ListFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for the analyze subcommand.
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Whole-file checksum listing (`<hash> <file>` per line)
    #[arg(value_name = "WHOLE_CHECKSUMS")]
    pub whole_checksums: PathBuf,

    /// Block checksum listing (`<hash> <file> offset <start>-<end>` per line)
    #[arg(value_name = "BLOCK_CHECKSUMS")]
    pub block_checksums: PathBuf,

    /// Minimum shared blocks a file needs to be grouped
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub min_blocks: Option<u64>,

    /// Keep top-level components that hold a single file
    #[arg(long)]
    pub no_singleton_filter: bool,

    /// Partition components on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    /// Bound on edge removals while splitting one component
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_split_iterations: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub output: ReportFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Also write the whole-file duplicate sets as JSON
    #[arg(long, value_name = "PATH")]
    pub save_duplicates: Option<PathBuf>,

    /// Also write every file's block vector, before pruning, as JSON
    #[arg(long, value_name = "PATH")]
    pub save_vectors: Option<PathBuf>,
}

/// Output format for the analysis report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Nested JSON tree with a run summary
    Json,
    /// One row per group, flattened with depth and parent
    Csv,
}

/// Output format for duplicate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// One block of lines per set, primary first
    Text,
    /// JSON array of sets
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}
