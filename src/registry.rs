//! Identifier registries for file names and block fingerprints.
//!
//! Every run builds a fresh [`Registry`]; identifiers are dense indices into
//! it and are only meaningful for the registry that issued them.
//!
//! # Example
//!
//! ```
//! use blockdedupe::registry::{BlockRange, Fingerprint, Registry};
//!
//! let mut registry = Registry::new();
//! let fp = Fingerprint::new("abc123", BlockRange::new(0, 1048575));
//!
//! let first = registry.checksums.intern(fp.clone());
//! let again = registry.checksums.intern(fp);
//!
//! assert_eq!(first, again);
//! assert_eq!(registry.checksums.count(first), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one file appearance in a [`FileRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Identifier of one distinct fingerprint in a [`ChecksumRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChecksumId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

impl fmt::Display for ChecksumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

/// Byte range of a block within its file, inclusive on both ends as reported
/// by the block hashing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    /// First byte offset of the block
    pub start: u64,
    /// Last byte offset of the block
    pub end: u64,
}

impl BlockRange {
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Content hash of a block together with the range it was taken from.
///
/// Two fingerprints are equal only if both the hash and the range match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hash value as reported by the hashing tool (hexadecimal)
    pub hash: String,
    /// Block position within the file
    pub range: BlockRange,
}

impl Fingerprint {
    #[must_use]
    pub fn new(hash: impl Into<String>, range: BlockRange) -> Self {
        Self {
            hash: hash.into(),
            range,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hash, self.range)
    }
}

/// Maps file names to [`FileId`]s.
///
/// Interning never reuses an id: submitting the same name twice yields two
/// distinct ids. Callers that want one id per name aggregate by name first
/// (the vector builder does).
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    names: Vec<String>,
}

impl FileRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new id for `name`.
    pub fn intern(&mut self, name: impl Into<String>) -> FileId {
        let id = FileId(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    /// Name registered for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn resolve(&self, id: FileId) -> &str {
        &self.names[id.0 as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Maps fingerprints to [`ChecksumId`]s and counts how often each recurs.
#[derive(Debug, Clone, Default)]
pub struct ChecksumRegistry {
    index: HashMap<Fingerprint, ChecksumId>,
    fingerprints: Vec<Fingerprint>,
    counts: Vec<usize>,
}

impl ChecksumRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `fingerprint`, allocating one on first sight.
    ///
    /// Every call counts as one occurrence.
    pub fn intern(&mut self, fingerprint: Fingerprint) -> ChecksumId {
        if let Some(&id) = self.index.get(&fingerprint) {
            self.counts[id.0 as usize] += 1;
            return id;
        }

        let id = ChecksumId(self.fingerprints.len() as u32);
        self.index.insert(fingerprint.clone(), id);
        self.fingerprints.push(fingerprint);
        self.counts.push(1);
        id
    }

    /// Number of times the fingerprint behind `id` was interned.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn count(&self, id: ChecksumId) -> usize {
        self.counts[id.0 as usize]
    }

    /// Fingerprint registered for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn resolve(&self, id: ChecksumId) -> &Fingerprint {
        &self.fingerprints[id.0 as usize]
    }

    /// Byte range of the block behind `id`.
    #[must_use]
    pub fn range_of(&self, id: ChecksumId) -> BlockRange {
        self.resolve(id).range
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Both registries of one run.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub files: FileRegistry,
    pub checksums: ChecksumRegistry,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
