//! Resolution of a dedupe-group tree into the externally consumable report.
//!
//! The partitioner works on numeric identifiers. The report replaces them
//! with file names and block fingerprints from the [`Registry`] that issued
//! them, keeping names and savings as they are.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::graph::DedupeGroup;
use crate::registry::{ChecksumId, FileId, Fingerprint, Registry};
use crate::vectors::FileVector;

/// A dedupe group with every identifier resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGroup {
    /// Opaque unique name
    pub name: String,
    /// Every file of the group, subgroups included
    pub files: Vec<String>,
    /// Files attributable to this level only
    pub selected_files: Vec<String>,
    /// Every block of the group, subgroups included
    pub csums: Vec<Fingerprint>,
    /// Blocks attributable to this level only
    pub selected_csums: Vec<Fingerprint>,
    /// Redundant block copies eliminable at this level and below
    pub savings: u64,
    /// Groups this one was split into
    #[serde(rename = "subgroup")]
    pub subgroups: Vec<ResolvedGroup>,
}

impl ResolvedGroup {
    /// Visit this group and every nested subgroup, depth first, together
    /// with its depth (0 for this group) and its parent's name.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ResolvedGroup, usize, Option<&'a str>)) {
        self.walk_at(0, None, visit);
    }

    fn walk_at<'a>(
        &'a self,
        depth: usize,
        parent: Option<&'a str>,
        visit: &mut impl FnMut(&'a ResolvedGroup, usize, Option<&'a str>),
    ) {
        visit(self, depth, parent);
        for subgroup in &self.subgroups {
            subgroup.walk_at(depth + 1, Some(&self.name), visit);
        }
    }

    /// Number of groups in this tree, this one included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _, _| count += 1);
        count
    }
}

/// Resolve `group` and its subgroups through `registry`.
///
/// # Panics
///
/// Panics if `group` holds identifiers that `registry` did not issue.
#[must_use]
pub fn annotate_group(group: &DedupeGroup, registry: &Registry) -> ResolvedGroup {
    let file_names = |ids: &BTreeSet<FileId>| {
        ids.iter()
            .map(|&id| registry.files.resolve(id).to_string())
            .collect::<Vec<String>>()
    };
    let fingerprints = |ids: &BTreeSet<ChecksumId>| {
        ids.iter()
            .map(|&id| registry.checksums.resolve(id).clone())
            .collect::<Vec<Fingerprint>>()
    };

    ResolvedGroup {
        name: group.name.clone(),
        files: file_names(&group.files),
        selected_files: file_names(&group.selected_files),
        csums: fingerprints(&group.csums),
        selected_csums: fingerprints(&group.selected_csums),
        savings: group.savings,
        subgroups: group
            .subgroups
            .iter()
            .map(|sub| annotate_group(sub, registry))
            .collect(),
    }
}

/// A file vector with its file name and block fingerprints resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVector {
    pub file: String,
    pub blocks: Vec<Fingerprint>,
}

/// Resolve `vector` through `registry`.
///
/// # Panics
///
/// Panics if `vector` holds identifiers that `registry` did not issue.
#[must_use]
pub fn resolve_vector(vector: &FileVector, registry: &Registry) -> ResolvedVector {
    ResolvedVector {
        file: registry.files.resolve(vector.file).to_string(),
        blocks: vector
            .checksums
            .iter()
            .map(|&id| registry.checksums.resolve(id).clone())
            .collect(),
    }
}
