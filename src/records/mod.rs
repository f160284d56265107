//! Checksum records produced by block hashing tools.
//!
//! This module provides:
//! - Line parsing for whole-file and block hash output ([`parser`])
//! - Whole-file duplicate extraction ([`duplicates`])

pub mod duplicates;
pub mod parser;

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::Fingerprint;

pub use duplicates::{identify_duplicates, DuplicateMap, DuplicateSet};
pub use parser::{parse_block_line, parse_whole_file_line, read_block_records, read_whole_file_records};

/// A whole-file hash line: the file's content hash and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WholeFileRecord {
    /// Content hash of the entire file (lowercase hex)
    pub hash: String,
    /// File name as reported by the tool
    pub file: String,
}

/// A block hash line: one block's fingerprint and the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    /// Hash and byte range of the block
    pub fingerprint: Fingerprint,
    /// File name as reported by the tool
    pub file: String,
}

impl BlockRecord {
    #[must_use]
    pub fn new(fingerprint: Fingerprint, file: impl Into<String>) -> Self {
        Self {
            fingerprint,
            file: file.into(),
        }
    }
}

/// Errors that can occur while reading checksum records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A line did not have the expected shape.
    #[error("unparsable record{}: {line:?}", line_suffix(.line_number))]
    Unparsable {
        /// 1-based line number, when read from a stream
        line_number: Option<usize>,
        /// The offending line
        line: String,
    },

    /// An I/O error occurred while reading records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred while opening a record file.
    #[error("I/O error for {path}: {source}")]
    IoWithPath {
        /// Path of the record file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

fn line_suffix(line_number: &Option<usize>) -> String {
    line_number.map(|n| format!(" at line {n}")).unwrap_or_default()
}

impl RecordError {
    pub(crate) fn unparsable(line: &str) -> Self {
        Self::Unparsable {
            line_number: None,
            line: line.to_string(),
        }
    }

    /// Attach a line number to an [`RecordError::Unparsable`] error.
    #[must_use]
    pub fn at_line(self, number: usize) -> Self {
        match self {
            Self::Unparsable { line, .. } => Self::Unparsable {
                line_number: Some(number),
                line,
            },
            other => other,
        }
    }
}

/// Open and read a whole-file hash listing.
///
/// # Errors
///
/// Returns [`RecordError::IoWithPath`] if the file cannot be opened, or any
/// error from [`read_whole_file_records`].
pub fn load_whole_file_records(path: &std::path::Path) -> Result<Vec<WholeFileRecord>, RecordError> {
    let reader = open(path)?;
    read_whole_file_records(reader)
}

/// Open and read a block hash listing.
///
/// # Errors
///
/// Returns [`RecordError::IoWithPath`] if the file cannot be opened, or any
/// error from [`read_block_records`].
pub fn load_block_records(path: &std::path::Path) -> Result<Vec<BlockRecord>, RecordError> {
    let reader = open(path)?;
    read_block_records(reader)
}

fn open(path: &std::path::Path) -> Result<std::io::BufReader<std::fs::File>, RecordError> {
    log::info!("Reading checksum records from {}", path.display());
    let file = std::fs::File::open(path).map_err(|source| RecordError::IoWithPath {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(std::io::BufReader::new(file))
}
