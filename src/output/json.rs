//! JSON output for analysis reports and duplicate sets.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "name": "0b6e...",
//!       "files": ["/data/a.img", "/data/b.img"],
//!       "selected_files": ["/data/a.img", "/data/b.img"],
//!       "csums": [{"hash": "ab12...", "range": {"start": 0, "end": 1048575}}],
//!       "selected_csums": [{"hash": "ab12...", "range": {"start": 0, "end": 1048575}}],
//!       "savings": 1,
//!       "subgroup": []
//!     }
//!   ],
//!   "summary": {
//!     "input_records": 4,
//!     "groups": 1,
//!     "total_savings": 1,
//!     "duration_ms": 3,
//!     "exit_code": 0,
//!     "exit_code_name": "BD000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::analyzer::AnalysisSummary;
use crate::error::ExitCode;
use crate::records::DuplicateSet;
use crate::report::{ResolvedGroup, ResolvedVector};

/// Run summary in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Block records consumed
    pub input_records: usize,
    /// Distinct file names among the block records
    pub files_seen: usize,
    /// Files skipped as whole-file duplicates
    pub dropped_duplicates: usize,
    /// Files skipped for holding a single distinct block
    pub dropped_single_block: usize,
    /// Vectors built before pruning
    pub vectors_built: usize,
    /// Vectors left after pruning
    pub vectors_pruned: usize,
    /// File nodes in the graph
    pub graph_files: usize,
    /// Checksum nodes in the graph
    pub graph_checksums: usize,
    /// Edges in the graph
    pub graph_edges: usize,
    /// Connected components of the graph
    pub components: usize,
    /// Top-level groups reported
    pub groups: usize,
    /// Groups at every level
    pub total_groups: usize,
    /// Savings summed over top-level groups
    pub total_savings: u64,
    /// Edges severed while splitting conflicts
    pub split_iterations: usize,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "BD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    #[must_use]
    pub fn from_analysis_summary(summary: &AnalysisSummary, exit_code: ExitCode) -> Self {
        Self {
            input_records: summary.input_records,
            files_seen: summary.files_seen,
            dropped_duplicates: summary.dropped_duplicates,
            dropped_single_block: summary.dropped_single_block,
            vectors_built: summary.vectors_built,
            vectors_pruned: summary.vectors_pruned,
            graph_files: summary.graph_files,
            graph_checksums: summary.graph_checksums,
            graph_edges: summary.graph_edges,
            components: summary.components,
            groups: summary.groups,
            total_groups: summary.total_groups,
            total_savings: summary.total_savings,
            split_iterations: summary.split_iterations,
            duration_ms: summary.duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Top-level dedupe groups, subgroups nested
    pub groups: Vec<ResolvedGroup>,
    /// Run summary
    pub summary: JsonSummary,
}

impl JsonOutput {
    #[must_use]
    pub fn new(groups: &[ResolvedGroup], summary: &AnalysisSummary, exit_code: ExitCode) -> Self {
        Self {
            groups: groups.to_vec(),
            summary: JsonSummary::from_analysis_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Write whole-file duplicate sets as a JSON array followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_duplicate_sets<W: Write>(
    sets: &[DuplicateSet],
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    write_json(sets, writer, pretty)
}

/// Write resolved file vectors as a JSON array followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_vectors<W: Write>(
    vectors: &[ResolvedVector],
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    write_json(vectors, writer, pretty)
}

fn write_json<T: Serialize + ?Sized, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
