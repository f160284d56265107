//! Output formatters for analysis reports and duplicate listings.
//!
//! - JSON for automation and nested inspection
//! - CSV for spreadsheet import (flattened tree)
//! - Plain text for whole-file duplicate listings
//!
//! # Example
//!
//! ```
//! use blockdedupe::analyzer::Analyzer;
//! use blockdedupe::error::ExitCode;
//! use blockdedupe::output::json::JsonOutput;
//! use blockdedupe::records::DuplicateMap;
//!
//! let (groups, summary) = Analyzer::with_defaults()
//!     .analyze(&DuplicateMap::new(), Vec::new())
//!     .unwrap();
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::NoGroups);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;

use std::io;

use crate::records::DuplicateSet;

pub use csv::CsvOutput;
pub use json::JsonOutput;

/// Write duplicate sets as text: the hash, then one indented line per file
/// with the primary marked, and a blank line between sets.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_duplicate_text<W: io::Write>(sets: &[DuplicateSet], writer: &mut W) -> io::Result<()> {
    for (idx, set) in sets.iter().enumerate() {
        if idx > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "{} ({} files)", set.hash, set.files.len())?;
        for (pos, file) in set.files.iter().enumerate() {
            let marker = if pos == 0 { "*" } else { " " };
            writeln!(writer, "  {marker} {file}")?;
        }
    }
    Ok(())
}
