//! File/checksum graph and its partitioning into dedupe groups.
//!
//! This module provides functionality for:
//! - Building the bipartite file/checksum graph ([`bipartite`])
//! - Splitting components with range conflicts into nested groups ([`partition`])

pub mod bipartite;
pub mod partition;

pub use bipartite::{BipartiteGraph, Edge, Node};
pub use partition::{
    find_conflicts, optimize_dedupe_group, path_edges, path_intersection, ConflictSet,
    DedupeGroup, PartitionConfig, PartitionError, PartitionStats, Partitioner,
    DEFAULT_MAX_SPLIT_ITERATIONS,
};
