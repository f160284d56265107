//! CSV output for analysis reports.
//!
//! The group tree is flattened depth first, one row per group.
//!
//! # Columns
//!
//! - `group`: Group name
//! - `parent`: Parent group name (empty for top-level groups)
//! - `depth`: Nesting depth, 0 for top-level groups
//! - `files`: Number of files in the group, subgroups included
//! - `selected_files`: Files attributable to this level, `;`-separated
//! - `selected_csums`: Blocks attributable to this level as `hash@start-end`,
//!   `;`-separated
//! - `savings`: Redundant block copies eliminable at this level and below

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::report::ResolvedGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group: &'a str,
    parent: &'a str,
    depth: usize,
    files: usize,
    selected_files: String,
    selected_csums: String,
    savings: u64,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [ResolvedGroup],
}

impl<'a> CsvOutput<'a> {
    #[must_use]
    pub fn new(groups: &'a [ResolvedGroup]) -> Self {
        Self { groups }
    }

    /// Write a header and one row per group.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut rows = Vec::new();
        for group in self.groups {
            group.walk(&mut |group, depth, parent| {
                rows.push(CsvRow {
                    group: &group.name,
                    parent: parent.unwrap_or_default(),
                    depth,
                    files: group.files.len(),
                    selected_files: group.selected_files.join(";"),
                    selected_csums: group
                        .selected_csums
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(";"),
                    savings: group.savings,
                });
            });
        }

        if rows.is_empty() {
            csv_writer.write_record([
                "group",
                "parent",
                "depth",
                "files",
                "selected_files",
                "selected_csums",
                "savings",
            ])?;
        }
        for row in rows {
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
