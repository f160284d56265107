//! Aggregation of block records into file vectors.
//!
//! Records arrive in any order. They are grouped by file name first, then
//! each file is judged as a whole:
//!
//! - a file listed as a whole-file duplicate is dropped (its primary copy
//!   already stands for its content),
//! - a file with fewer than two distinct blocks is dropped (whole-file
//!   deduplication covers it),
//! - every other file is interned and emitted as a [`FileVector`].
//!
//! Files are interned in name order and blocks in fingerprint order, so the
//! same record set always receives the same identifiers.
//!
//! # Example
//!
//! ```
//! use blockdedupe::records::{BlockRecord, DuplicateMap};
//! use blockdedupe::registry::{BlockRange, Fingerprint, Registry};
//! use blockdedupe::vectors::build_vectors;
//!
//! let records = vec![
//!     BlockRecord::new(Fingerprint::new("aa", BlockRange::new(0, 9)), "/a"),
//!     BlockRecord::new(Fingerprint::new("bb", BlockRange::new(10, 19)), "/a"),
//!     BlockRecord::new(Fingerprint::new("aa", BlockRange::new(0, 9)), "/tiny"),
//! ];
//!
//! let mut registry = Registry::new();
//! let (vectors, stats) = build_vectors(records, &DuplicateMap::new(), &mut registry);
//!
//! assert_eq!(vectors.len(), 1);
//! assert_eq!(stats.dropped_single_block, 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use super::FileVector;
use crate::records::{BlockRecord, DuplicateMap};
use crate::registry::{Fingerprint, Registry};

/// Statistics from vector construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Block records consumed
    pub input_records: usize,
    /// Distinct file names seen
    pub files_seen: usize,
    /// Files skipped because they are whole-file duplicates
    pub dropped_duplicates: usize,
    /// Files skipped because they hold fewer than two distinct blocks
    pub dropped_single_block: usize,
    /// Vectors emitted
    pub vectors: usize,
}

/// Aggregate `records` by file and emit one vector per candidate file.
///
/// Populates `registry` with every emitted file and block; dropped files
/// leave no trace in it.
pub fn build_vectors(
    records: impl IntoIterator<Item = BlockRecord>,
    duplicates: &DuplicateMap,
    registry: &mut Registry,
) -> (Vec<FileVector>, BuildStats) {
    let mut stats = BuildStats::default();
    let mut by_file: BTreeMap<String, BTreeSet<Fingerprint>> = BTreeMap::new();

    for record in records {
        stats.input_records += 1;
        by_file
            .entry(record.file)
            .or_default()
            .insert(record.fingerprint);
    }
    stats.files_seen = by_file.len();

    let mut vectors = Vec::new();
    for (name, fingerprints) in by_file {
        if duplicates.is_duplicate(&name) {
            stats.dropped_duplicates += 1;
            log::trace!("Skipping whole-file duplicate: {}", name);
            continue;
        }
        if fingerprints.len() < 2 {
            stats.dropped_single_block += 1;
            log::trace!("Skipping single-block file: {}", name);
            continue;
        }

        let file = registry.files.intern(name);
        let checksums = fingerprints
            .into_iter()
            .map(|fp| registry.checksums.intern(fp))
            .collect();
        vectors.push(FileVector::new(file, checksums));
    }
    stats.vectors = vectors.len();

    log::info!(
        "Vector build: {} records from {} files -> {} vectors ({} duplicates, {} single-block skipped)",
        stats.input_records,
        stats.files_seen,
        stats.vectors,
        stats.dropped_duplicates,
        stats.dropped_single_block
    );

    (vectors, stats)
}
