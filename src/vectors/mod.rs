//! Per-file checksum vectors.
//!
//! This module provides functionality for:
//! - Aggregating block records into one vector per file ([`builder`])
//! - Pruning blocks no other file shares ([`pruner`])

pub mod builder;
pub mod pruner;

use crate::registry::{ChecksumId, FileId};

pub use builder::{build_vectors, BuildStats};
pub use pruner::{prune_vectors, PruneStats, DEFAULT_MIN_BLOCKS};

/// One file and the ordered set of block checksums it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVector {
    /// The file
    pub file: FileId,
    /// Checksum ids, sorted ascending and free of repeats
    pub checksums: Vec<ChecksumId>,
}

impl FileVector {
    /// Create a vector, sorting and deduplicating `checksums`.
    #[must_use]
    pub fn new(file: FileId, mut checksums: Vec<ChecksumId>) -> Self {
        checksums.sort_unstable();
        checksums.dedup();
        Self { file, checksums }
    }

    /// Number of distinct blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checksums.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checksums.is_empty()
    }
}
