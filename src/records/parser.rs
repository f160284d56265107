//! Parsing of block-hash tool output.
//!
//! Two line shapes are understood, both as produced by md5deep-style tools:
//!
//! - whole-file hashes: `<hex-hash> <filename>`
//! - block hashes: `<hex-hash> <filename> offset <start>-<end>`
//!
//! File names may contain spaces; the hash is always the first token.
//!
//! # Example
//!
//! ```
//! use blockdedupe::records::parser::parse_block_line;
//!
//! let record = parse_block_line("d41d8cd9 /srv/disk image.img offset 0-1048575").unwrap();
//! assert_eq!(record.file, "/srv/disk image.img");
//! assert_eq!(record.fingerprint.range.end, 1048575);
//! ```

use std::io::BufRead;
use std::sync::OnceLock;

use regex::Regex;

use super::{BlockRecord, RecordError, WholeFileRecord};
use crate::registry::{BlockRange, Fingerprint};

fn whole_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9a-fA-F]+)\s+(\S.*)$").expect("whole-file pattern"))
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9a-fA-F]+)\s+(\S.*?)\s+offset\s+(\d+)-(\d+)$").expect("block pattern")
    })
}

/// Parse one whole-file hash line.
///
/// # Errors
///
/// Returns [`RecordError::Unparsable`] (without a line number) if the line
/// does not have the `<hex-hash> <filename>` shape.
pub fn parse_whole_file_line(line: &str) -> Result<WholeFileRecord, RecordError> {
    let text = line.trim_end();
    let caps = whole_file_re()
        .captures(text)
        .ok_or_else(|| RecordError::unparsable(line))?;

    Ok(WholeFileRecord {
        hash: caps[1].to_ascii_lowercase(),
        file: caps[2].to_string(),
    })
}

/// Parse one block hash line.
///
/// # Errors
///
/// Returns [`RecordError::Unparsable`] (without a line number) if the line
/// does not match, if an offset overflows `u64`, or if the range is reversed.
pub fn parse_block_line(line: &str) -> Result<BlockRecord, RecordError> {
    let text = line.trim_end();
    let caps = block_re()
        .captures(text)
        .ok_or_else(|| RecordError::unparsable(line))?;

    let start: u64 = caps[3].parse().map_err(|_| RecordError::unparsable(line))?;
    let end: u64 = caps[4].parse().map_err(|_| RecordError::unparsable(line))?;
    if start > end {
        return Err(RecordError::unparsable(line));
    }

    Ok(BlockRecord {
        fingerprint: Fingerprint::new(caps[1].to_ascii_lowercase(), BlockRange::new(start, end)),
        file: caps[2].to_string(),
    })
}

/// Read every whole-file record from `reader`.
///
/// Blank lines are skipped. The first malformed line aborts the read.
///
/// # Errors
///
/// Returns [`RecordError::Unparsable`] with the 1-based line number, or
/// [`RecordError::Io`] if reading fails.
pub fn read_whole_file_records<R: BufRead>(reader: R) -> Result<Vec<WholeFileRecord>, RecordError> {
    read_lines(reader, parse_whole_file_line)
}

/// Read every block record from `reader`.
///
/// # Errors
///
/// Same as [`read_whole_file_records`].
pub fn read_block_records<R: BufRead>(reader: R) -> Result<Vec<BlockRecord>, RecordError> {
    read_lines(reader, parse_block_line)
}

fn read_lines<R, T, F>(reader: R, parse: F) -> Result<Vec<T>, RecordError>
where
    R: BufRead,
    F: Fn(&str) -> Result<T, RecordError>,
{
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse(&line).map_err(|e| e.at_line(idx + 1))?;
        records.push(record);
    }
    log::debug!("Read {} records", records.len());
    Ok(records)
}
