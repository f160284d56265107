//! Partitioning of the file/checksum graph into dedupe groups.
//!
//! # Overview
//!
//! Each connected component of the graph is a candidate dedupe group. A
//! component is only sound as a single group if no two of its checksums claim
//! the same byte range; otherwise consolidating it would have to pick one
//! block content for that range over another.
//!
//! Components with such range conflicts are split:
//!
//! 1. Restrict the component to its files plus the conflicting checksums.
//! 2. While the restricted graph is one piece, find a shortest path between
//!    a representative pair of each conflicting range, intersect the edge
//!    sets of those paths, and sever the first shared edge.
//! 3. Recurse into every resulting piece; those become subgroups.
//!
//! Savings are tallied bottom-up: a group's savings are its subgroups'
//! savings plus, for every checksum of the group, its degree minus one.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use thiserror::Error;

use super::bipartite::{BipartiteGraph, Edge, Node};
use crate::registry::{BlockRange, ChecksumId, ChecksumRegistry, FileId};

/// Default bound on edge removals while splitting one component.
pub const DEFAULT_MAX_SPLIT_ITERATIONS: usize = 10_000;

/// Errors that can occur while partitioning.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// No edge can be severed although conflicts remain. Indicates a
    /// modelling bug, never a recoverable condition.
    #[error("internal invariant violated in group {group}: {detail}")]
    InternalInvariantViolation {
        /// Name of the group being split
        group: String,
        /// What went wrong
        detail: String,
    },

    /// The edge-removal loop hit its iteration bound.
    #[error(
        "partition of group {group} did not converge after {iterations} edge removals \
         ({} files, {} checksums)",
        count_files(.component),
        count_checksums(.component)
    )]
    PartitionNotConverging {
        /// Name of the group being split
        group: String,
        /// Edge removals performed
        iterations: usize,
        /// Nodes of the offending component
        component: Vec<Node>,
    },
}

fn count_files<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> usize {
    nodes.into_iter().filter(|n| matches!(n, Node::File(_))).count()
}

fn count_checksums<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> usize {
    nodes.into_iter().filter(|n| matches!(n, Node::Checksum(_))).count()
}

/// Configuration for partitioning.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Discard top-level components holding at most one file.
    pub singleton_filter: bool,
    /// Bound on edge removals per component.
    pub max_split_iterations: usize,
    /// Process independent top-level components on the rayon pool.
    pub parallel: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            singleton_filter: true,
            max_split_iterations: DEFAULT_MAX_SPLIT_ITERATIONS,
            parallel: true,
        }
    }
}

impl PartitionConfig {
    #[must_use]
    pub fn with_singleton_filter(mut self, enabled: bool) -> Self {
        self.singleton_filter = enabled;
        self
    }

    #[must_use]
    pub fn with_max_split_iterations(mut self, iterations: usize) -> Self {
        self.max_split_iterations = iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}

/// Statistics from partitioning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// Top-level connected components found
    pub components: usize,
    /// Top-level components discarded by the singleton filter
    pub filtered_singletons: usize,
    /// Groups built at every level, subgroups included
    pub groups: usize,
    /// Edges severed while splitting conflicts
    pub split_iterations: usize,
}

impl PartitionStats {
    fn merge(&mut self, other: &PartitionStats) {
        self.groups += other.groups;
        self.split_iterations += other.split_iterations;
    }
}

/// A set of files and checksums that can be consolidated together, with the
/// finer-grained groups it had to be split into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeGroup {
    /// Opaque unique name
    pub name: String,
    /// Every file of the group, subgroups included
    pub files: BTreeSet<FileId>,
    /// Every checksum of the group, subgroups included
    pub csums: BTreeSet<ChecksumId>,
    /// Groups this one was split into
    pub subgroups: Vec<DedupeGroup>,
    /// Files attributable to this level only
    pub selected_files: BTreeSet<FileId>,
    /// Checksums attributable to this level only
    pub selected_csums: BTreeSet<ChecksumId>,
    /// Redundant block copies eliminable at this level and below
    pub savings: u64,
}

impl DedupeGroup {
    /// Whether the group was split into subgroups.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.subgroups.is_empty()
    }

    /// Number of groups in this tree, this one included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        1 + self.subgroups.iter().map(DedupeGroup::group_count).sum::<usize>()
    }

    /// Depth of this tree (1 for a leaf).
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.subgroups.iter().map(DedupeGroup::depth).max().unwrap_or(0)
    }
}

/// Checksums of one component grouped by byte range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSet {
    /// Checksums alone on their range
    pub compatible: Vec<ChecksumId>,
    /// Checksums sharing their range with another checksum
    pub conflicting: Vec<ChecksumId>,
    /// Ranges claimed by more than one checksum, with their claimants
    pub ranges: BTreeMap<BlockRange, Vec<ChecksumId>>,
}

impl ConflictSet {
    /// Whether any range is claimed by more than one checksum.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.ranges.is_empty()
    }
}

/// Group `csums` by byte range and separate conflicts from compatible ones.
///
/// # Example
///
/// ```
/// use blockdedupe::graph::find_conflicts;
/// use blockdedupe::registry::{BlockRange, ChecksumRegistry, Fingerprint};
///
/// let mut checksums = ChecksumRegistry::new();
/// let a = checksums.intern(Fingerprint::new("aa", BlockRange::new(0, 99)));
/// let b = checksums.intern(Fingerprint::new("bb", BlockRange::new(0, 99)));
/// let c = checksums.intern(Fingerprint::new("cc", BlockRange::new(100, 199)));
///
/// let conflicts = find_conflicts([a, b, c], &checksums);
/// assert_eq!(conflicts.compatible, vec![c]);
/// assert_eq!(conflicts.conflicting, vec![a, b]);
/// ```
pub fn find_conflicts(
    csums: impl IntoIterator<Item = ChecksumId>,
    checksums: &ChecksumRegistry,
) -> ConflictSet {
    let mut by_range: BTreeMap<BlockRange, BTreeSet<ChecksumId>> = BTreeMap::new();
    for id in csums {
        by_range.entry(checksums.range_of(id)).or_default().insert(id);
    }

    let mut set = ConflictSet::default();
    for (range, ids) in by_range {
        if ids.len() == 1 {
            set.compatible.extend(ids);
        } else {
            let ids: Vec<ChecksumId> = ids.into_iter().collect();
            set.conflicting.extend(ids.iter().copied());
            set.ranges.insert(range, ids);
        }
    }
    set.compatible.sort_unstable();
    set.conflicting.sort_unstable();
    set
}

/// The edges traversed by `path`, in canonical form.
#[must_use]
pub fn path_edges(path: &[Node]) -> BTreeSet<Edge> {
    path.windows(2)
        .filter_map(|pair| Edge::between(pair[0], pair[1]))
        .collect()
}

/// Non-empty intersections of each consecutive pair of edge sets, in order.
#[must_use]
pub fn path_intersection(paths: &[BTreeSet<Edge>]) -> Vec<BTreeSet<Edge>> {
    paths
        .windows(2)
        .map(|pair| pair[0].intersection(&pair[1]).copied().collect::<BTreeSet<Edge>>())
        .filter(|common| !common.is_empty())
        .collect()
}

/// Reserved for promoting a preferred subgroup to direct membership of its
/// parent. Currently returns the group unchanged.
#[must_use]
pub fn optimize_dedupe_group(group: DedupeGroup) -> DedupeGroup {
    group
}

/// Splits a bipartite graph into a forest of dedupe groups.
pub struct Partitioner<'a> {
    checksums: &'a ChecksumRegistry,
    config: PartitionConfig,
}

impl<'a> Partitioner<'a> {
    /// Create a partitioner resolving byte ranges through `checksums`.
    #[must_use]
    pub fn new(checksums: &'a ChecksumRegistry, config: PartitionConfig) -> Self {
        Self { checksums, config }
    }

    /// Partition `graph` into top-level dedupe groups.
    ///
    /// Top-level components with at most one file are dropped when the
    /// singleton filter is enabled; nested levels are never filtered.
    ///
    /// # Errors
    ///
    /// Returns the first [`PartitionError`] raised by any component.
    pub fn partition(
        &self,
        graph: &BipartiteGraph,
    ) -> Result<(Vec<DedupeGroup>, PartitionStats), PartitionError> {
        let components = graph.connected_components();
        let mut stats = PartitionStats {
            components: components.len(),
            ..Default::default()
        };

        let candidates: Vec<BTreeSet<Node>> = components
            .into_iter()
            .filter(|component| {
                let keep = !self.config.singleton_filter || count_files(component.iter()) > 1;
                if !keep {
                    stats.filtered_singletons += 1;
                }
                keep
            })
            .collect();

        log::info!(
            "Partition: {} components, {} candidates after singleton filter",
            stats.components,
            candidates.len()
        );

        let process = |component: &BTreeSet<Node>| {
            let mut local = PartitionStats::default();
            let subgraph = graph.induced_subgraph(component);
            self.process_component(&subgraph, component, &mut local)
                .map(|group| (group, local))
        };

        let results: Vec<(DedupeGroup, PartitionStats)> = if self.config.parallel {
            candidates.par_iter().map(process).collect::<Result<_, _>>()?
        } else {
            candidates.iter().map(process).collect::<Result<_, _>>()?
        };

        let mut groups = Vec::with_capacity(results.len());
        for (group, local) in results {
            stats.merge(&local);
            groups.push(group);
        }

        log::info!(
            "Partition complete: {} top-level groups, {} groups in total, {} edges severed",
            groups.len(),
            stats.groups,
            stats.split_iterations
        );

        Ok((groups, stats))
    }

    /// Build the group for one component. `subgraph` is the component's own
    /// graph; its degrees feed the savings tally.
    fn process_component(
        &self,
        subgraph: &BipartiteGraph,
        component: &BTreeSet<Node>,
        stats: &mut PartitionStats,
    ) -> Result<DedupeGroup, PartitionError> {
        let name = uuid::Uuid::new_v4().to_string();
        let files: BTreeSet<FileId> = component.iter().filter_map(|n| n.as_file()).collect();
        let csums: BTreeSet<ChecksumId> =
            component.iter().filter_map(|n| n.as_checksum()).collect();

        let conflicts = find_conflicts(csums.iter().copied(), self.checksums);
        let subgroups = if conflicts.has_conflicts() {
            log::debug!(
                "Group {}: {} files, {} checksums, {} conflicting ranges",
                name,
                files.len(),
                csums.len(),
                conflicts.ranges.len()
            );
            self.split(&name, subgraph, &files, conflicts, stats)?
        } else {
            Vec::new()
        };

        let mut selected_files = files.clone();
        let mut selected_csums = csums.clone();
        let mut savings: u64 = 0;
        for subgroup in &subgroups {
            for file in &subgroup.files {
                selected_files.remove(file);
            }
            for csum in &subgroup.csums {
                selected_csums.remove(csum);
            }
            savings += subgroup.savings;
        }
        savings += csums
            .iter()
            .map(|&c| subgraph.degree(Node::Checksum(c)).saturating_sub(1) as u64)
            .sum::<u64>();

        stats.groups += 1;
        let group = DedupeGroup {
            name,
            files,
            csums,
            subgroups,
            selected_files,
            selected_csums,
            savings,
        };
        Ok(optimize_dedupe_group(group))
    }

    /// Separate the conflicting checksums of one component into subgroups.
    fn split(
        &self,
        name: &str,
        subgraph: &BipartiteGraph,
        files: &BTreeSet<FileId>,
        mut conflicts: ConflictSet,
        stats: &mut PartitionStats,
    ) -> Result<Vec<DedupeGroup>, PartitionError> {
        let keep: BTreeSet<Node> = files
            .iter()
            .map(|&f| Node::File(f))
            .chain(conflicts.conflicting.iter().map(|&c| Node::Checksum(c)))
            .collect();
        let mut restricted = subgraph.induced_subgraph(&keep);
        let mut pieces = restricted.connected_components();
        let mut iterations = 0;

        while pieces.len() == 1 && conflicts.has_conflicts() {
            if iterations >= self.config.max_split_iterations {
                return Err(PartitionError::PartitionNotConverging {
                    group: name.to_string(),
                    iterations,
                    component: restricted.nodes().collect(),
                });
            }
            iterations += 1;

            let edge = self.severable_edge(name, &restricted, &conflicts)?;
            log::trace!("Group {}: severing edge {}", name, edge);
            restricted.remove_edge(edge);

            pieces = restricted.connected_components();
            conflicts = find_conflicts(restricted.checksums(), self.checksums);
        }
        stats.split_iterations += iterations;

        log::debug!(
            "Group {}: split into {} pieces after {} edge removals",
            name,
            pieces.len(),
            iterations
        );

        pieces
            .iter()
            .map(|piece| {
                let piece_graph = restricted.induced_subgraph(piece);
                self.process_component(&piece_graph, piece, stats)
            })
            .collect()
    }

    /// Pick the edge to sever: the first edge shared by the shortest paths of
    /// consecutive conflicting ranges. A lone conflicting range uses its own
    /// path.
    fn severable_edge(
        &self,
        name: &str,
        restricted: &BipartiteGraph,
        conflicts: &ConflictSet,
    ) -> Result<Edge, PartitionError> {
        let mut paths = Vec::with_capacity(conflicts.ranges.len());
        for (range, ids) in &conflicts.ranges {
            let (src, dst) = match ids.as_slice() {
                [src, dst, ..] => (*src, *dst),
                _ => continue,
            };
            let path = restricted
                .shortest_path(Node::Checksum(src), Node::Checksum(dst))
                .ok_or_else(|| PartitionError::InternalInvariantViolation {
                    group: name.to_string(),
                    detail: format!("no path between {src} and {dst} sharing range {range}"),
                })?;
            paths.push(path_edges(&path));
        }

        let candidates = if paths.len() == 1 {
            paths.pop()
        } else {
            path_intersection(&paths).into_iter().next()
        };

        candidates
            .and_then(|edges| edges.into_iter().next())
            .ok_or_else(|| PartitionError::InternalInvariantViolation {
                group: name.to_string(),
                detail: format!(
                    "{} conflicting ranges share no path edge",
                    conflicts.ranges.len()
                ),
            })
    }
}
