//! Whole-file duplicate extraction.
//!
//! Files whose entire content hash matches another file's are redundant as a
//! whole; sub-file analysis only needs to consider one representative of
//! each such set. The first file (in input order) of a set is its primary,
//! every other member maps to it in the [`DuplicateMap`].
//!
//! # Example
//!
//! ```
//! use blockdedupe::records::{identify_duplicates, DuplicateMap, WholeFileRecord};
//!
//! let records = vec![
//!     WholeFileRecord { hash: "aa".into(), file: "/a".into() },
//!     WholeFileRecord { hash: "bb".into(), file: "/b".into() },
//!     WholeFileRecord { hash: "aa".into(), file: "/c".into() },
//! ];
//!
//! let sets = identify_duplicates(&records);
//! assert_eq!(sets.len(), 1);
//!
//! let map = DuplicateMap::from_sets(&sets);
//! assert!(map.is_duplicate("/c"));
//! assert!(!map.is_duplicate("/a"));
//! assert_eq!(map.primary_of("/c"), Some("/a"));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::WholeFileRecord;

/// Files sharing one whole-file hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    /// Whole-file content hash
    pub hash: String,
    /// Member file names, primary first
    pub files: Vec<String>,
}

impl DuplicateSet {
    /// The representative kept for sub-file analysis.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.files.first().map(String::as_str)
    }

    /// Redundant copies (every member except the primary).
    #[must_use]
    pub fn secondaries(&self) -> &[String] {
        self.files.get(1..).unwrap_or_default()
    }
}

/// Group file names by whole-file hash.
///
/// Input order is irrelevant for grouping; it only decides which member
/// becomes primary and the order of the returned sets (by first sighting of
/// each hash). Hashes seen for a single file are not returned.
#[must_use]
pub fn identify_duplicates(records: &[WholeFileRecord]) -> Vec<DuplicateSet> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_hash: HashMap<&str, Vec<String>> = HashMap::new();

    for record in records {
        let files = by_hash.entry(record.hash.as_str()).or_insert_with(|| {
            order.push(record.hash.as_str());
            Vec::new()
        });
        files.push(record.file.clone());
    }

    let sets: Vec<DuplicateSet> = order
        .into_iter()
        .filter_map(|hash| {
            let files = by_hash.remove(hash)?;
            (files.len() > 1).then(|| DuplicateSet {
                hash: hash.to_string(),
                files,
            })
        })
        .collect();

    log::info!(
        "Whole-file pass: {} records, {} duplicate sets, {} redundant files",
        records.len(),
        sets.len(),
        sets.iter().map(|s| s.secondaries().len()).sum::<usize>()
    );

    sets
}

/// Map from redundant file name to the primary copy it duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateMap {
    secondaries: HashMap<String, String>,
}

impl DuplicateMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from duplicate sets.
    #[must_use]
    pub fn from_sets(sets: &[DuplicateSet]) -> Self {
        let mut map = Self::new();
        for set in sets {
            if let Some(primary) = set.primary() {
                for secondary in set.secondaries() {
                    map.insert(secondary.clone(), primary.to_string());
                }
            }
        }
        map
    }

    /// Record `secondary` as a copy of `primary`.
    pub fn insert(&mut self, secondary: impl Into<String>, primary: impl Into<String>) {
        self.secondaries.insert(secondary.into(), primary.into());
    }

    /// Whether `name` is a redundant copy of some other file.
    #[must_use]
    pub fn is_duplicate(&self, name: &str) -> bool {
        self.secondaries.contains_key(name)
    }

    #[must_use]
    pub fn primary_of(&self, name: &str) -> Option<&str> {
        self.secondaries.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.secondaries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secondaries.is_empty()
    }
}
