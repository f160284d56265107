//! End-to-end sub-file dedupe analysis.
//!
//! # Overview
//!
//! The [`Analyzer`] runs the whole pipeline over one set of checksum records:
//! 1. **Vectors**: aggregate block records per file, skipping whole-file
//!    duplicates and single-block files (see [`crate::vectors::builder`])
//! 2. **Prune**: keep shared blocks only (see [`crate::vectors::pruner`])
//! 3. **Graph**: build the bipartite file/checksum graph
//! 4. **Partition**: split components into conflict-free dedupe groups
//! 5. **Annotate**: resolve identifiers into the report
//!
//! Every run owns a fresh [`Registry`], so analyzers can be reused.
//!
//! # Example
//!
//! ```
//! use blockdedupe::analyzer::Analyzer;
//! use blockdedupe::records::{BlockRecord, DuplicateMap};
//! use blockdedupe::registry::{BlockRange, Fingerprint};
//!
//! let block = |hash: &str, start: u64, file: &str| {
//!     BlockRecord::new(Fingerprint::new(hash, BlockRange::new(start, start + 99)), file)
//! };
//! let records = vec![
//!     block("aa", 0, "/a"),
//!     block("bb", 100, "/a"),
//!     block("aa", 0, "/b"),
//!     block("bb", 100, "/b"),
//! ];
//!
//! let analyzer = Analyzer::with_defaults().with_parallel(false);
//! let (groups, summary) = analyzer.analyze(&DuplicateMap::new(), records).unwrap();
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(summary.total_savings, 2);
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{
    BipartiteGraph, PartitionConfig, PartitionError, Partitioner, DEFAULT_MAX_SPLIT_ITERATIONS,
};
use crate::records::{self, BlockRecord, DuplicateMap, RecordError};
use crate::registry::Registry;
use crate::report::{annotate_group, resolve_vector, ResolvedGroup, ResolvedVector};
use crate::vectors::{build_vectors, prune_vectors, DEFAULT_MIN_BLOCKS};

/// Configuration for an [`Analyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Minimum shared blocks a file needs to stay a candidate.
    pub min_blocks: usize,
    /// Discard top-level components with at most one file.
    pub singleton_filter: bool,
    /// Bound on edge removals per component.
    pub max_split_iterations: usize,
    /// Partition independent components in parallel.
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_blocks: DEFAULT_MIN_BLOCKS,
            singleton_filter: true,
            max_split_iterations: DEFAULT_MAX_SPLIT_ITERATIONS,
            parallel: true,
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn with_min_blocks(mut self, min_blocks: usize) -> Self {
        self.min_blocks = min_blocks;
        self
    }

    #[must_use]
    pub fn with_singleton_filter(mut self, enabled: bool) -> Self {
        self.singleton_filter = enabled;
        self
    }

    /// Set the edge-removal bound (minimum 1).
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

    fn partition_config(&self) -> PartitionConfig {
        PartitionConfig::default()
            .with_singleton_filter(self.singleton_filter)
            .with_max_split_iterations(self.max_split_iterations)
            .with_parallel(self.parallel)
    }
}

/// Summary of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Block records consumed
    pub input_records: usize,
    /// Distinct file names among the block records
    pub files_seen: usize,
    /// Files skipped as whole-file duplicates
    pub dropped_duplicates: usize,
    /// Files skipped for holding a single distinct block
    pub dropped_single_block: usize,
    /// Vectors built before pruning
    pub vectors_built: usize,
    /// Vectors left after pruning
    pub vectors_pruned: usize,
    /// File nodes in the graph
    pub graph_files: usize,
    /// Checksum nodes in the graph
    pub graph_checksums: usize,
    /// Edges in the graph
    pub graph_edges: usize,
    /// Connected components of the graph
    pub components: usize,
    /// Top-level groups reported
    pub groups: usize,
    /// Groups at every level, subgroups included
    pub total_groups: usize,
    /// Savings summed over top-level groups
    pub total_savings: u64,
    /// Edges severed while splitting conflicts
    pub split_iterations: usize,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Top-level dedupe groups
    pub groups: Vec<ResolvedGroup>,
    /// Run summary
    pub summary: AnalysisSummary,
    /// Vectors as built, before pruning; empty unless requested
    pub vectors: Vec<ResolvedVector>,
}

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Reading checksum records failed.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Partitioning failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),
}

/// Runs the sub-file dedupe pipeline.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(AnalyzerConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[must_use]
    pub fn with_min_blocks(mut self, min_blocks: usize) -> Self {
        self.config = self.config.with_min_blocks(min_blocks);
        self
    }

    #[must_use]
    pub fn with_singleton_filter(mut self, enabled: bool) -> Self {
        self.config = self.config.with_singleton_filter(enabled);
        self
    }

    #[must_use]
    pub fn with_max_split_iterations(mut self, iterations: usize) -> Self {
        self.config = self.config.with_max_split_iterations(iterations);
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.config = self.config.with_parallel(enabled);
        self
    }

    /// Analyze block `records`, excluding the secondary copies named in
    /// `duplicates`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Partition`] if a component cannot be split.
    /// No partial result is returned.
    pub fn analyze(
        &self,
        duplicates: &DuplicateMap,
        records: impl IntoIterator<Item = BlockRecord>,
    ) -> Result<(Vec<ResolvedGroup>, AnalysisSummary), AnalysisError> {
        let analysis = self.run(duplicates, records, false)?;
        Ok((analysis.groups, analysis.summary))
    }

    /// Like [`Analyzer::analyze`], also returning every vector as built,
    /// before pruning, with names and fingerprints resolved.
    ///
    /// # Errors
    ///
    /// Same as [`Analyzer::analyze`].
    pub fn analyze_keeping_vectors(
        &self,
        duplicates: &DuplicateMap,
        records: impl IntoIterator<Item = BlockRecord>,
    ) -> Result<Analysis, AnalysisError> {
        self.run(duplicates, records, true)
    }

    fn run(
        &self,
        duplicates: &DuplicateMap,
        records: impl IntoIterator<Item = BlockRecord>,
        keep_vectors: bool,
    ) -> Result<Analysis, AnalysisError> {
        let start_time = Instant::now();
        let mut registry = Registry::new();

        let (vectors, build) = build_vectors(records, duplicates, &mut registry);
        let built = if keep_vectors {
            vectors
                .iter()
                .map(|vector| resolve_vector(vector, &registry))
                .collect()
        } else {
            Vec::new()
        };
        let (vectors, prune) =
            prune_vectors(vectors, self.config.min_blocks, &registry.checksums);
        let graph = BipartiteGraph::from_vectors(&vectors);

        let partitioner = Partitioner::new(&registry.checksums, self.config.partition_config());
        let (groups, partition) = partitioner.partition(&graph)?;

        let resolved: Vec<ResolvedGroup> = groups
            .iter()
            .map(|group| annotate_group(group, &registry))
            .collect();

        let summary = AnalysisSummary {
            input_records: build.input_records,
            files_seen: build.files_seen,
            dropped_duplicates: build.dropped_duplicates,
            dropped_single_block: build.dropped_single_block,
            vectors_built: build.vectors,
            vectors_pruned: prune.vectors,
            graph_files: graph.file_count(),
            graph_checksums: graph.checksum_count(),
            graph_edges: graph.edge_count(),
            components: partition.components,
            groups: resolved.len(),
            total_groups: partition.groups,
            total_savings: resolved.iter().map(|g| g.savings).sum(),
            split_iterations: partition.split_iterations,
            duration: start_time.elapsed(),
        };

        log::info!(
            "Analysis complete: {} groups, {} redundant blocks in {:?}",
            summary.groups,
            summary.total_savings,
            summary.duration
        );

        Ok(Analysis {
            groups: resolved,
            summary,
            vectors: built,
        })
    }

    /// Read both record files and analyze them.
    ///
    /// The whole-file listing supplies the duplicate map; the block listing
    /// supplies the records.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Record`] if either file cannot be read or
    /// parsed, or any error from [`Analyzer::analyze`].
    pub fn analyze_files(
        &self,
        whole_file_path: &Path,
        block_path: &Path,
    ) -> Result<(Vec<ResolvedGroup>, AnalysisSummary), AnalysisError> {
        let whole = records::load_whole_file_records(whole_file_path)?;
        let sets = records::identify_duplicates(&whole);
        let duplicates = DuplicateMap::from_sets(&sets);
        let blocks = records::load_block_records(block_path)?;
        self.analyze(&duplicates, blocks)
    }
}
