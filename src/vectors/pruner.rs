//! Removal of blocks that no other file shares.
//!
//! A block present in a single file can never be consolidated across files,
//! so it only adds noise to the graph. After those blocks are removed, files
//! left with fewer than `min_blocks` shared blocks stop being candidates.

use super::FileVector;
use crate::registry::ChecksumRegistry;

/// Default minimum number of shared blocks a file must keep.
pub const DEFAULT_MIN_BLOCKS: usize = 2;

/// Statistics from pruning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Vectors before pruning
    pub input_vectors: usize,
    /// Checksum references removed because the block is not shared
    pub unshared_refs: usize,
    /// Vectors dropped for falling below `min_blocks`
    pub dropped_vectors: usize,
    /// Vectors kept
    pub vectors: usize,
}

/// Keep only shared blocks and drop vectors left with fewer than `min_blocks`.
///
/// A block is shared when its corpus-wide count in `checksums` is above one.
///
/// # Example
///
/// ```
/// use blockdedupe::registry::{BlockRange, ChecksumRegistry, FileId, Fingerprint};
/// use blockdedupe::vectors::{prune_vectors, FileVector};
///
/// let mut checksums = ChecksumRegistry::new();
/// let shared = checksums.intern(Fingerprint::new("aa", BlockRange::new(0, 9)));
/// checksums.intern(Fingerprint::new("aa", BlockRange::new(0, 9)));
/// let own = checksums.intern(Fingerprint::new("bb", BlockRange::new(10, 19)));
///
/// let vectors = vec![FileVector::new(FileId(0), vec![shared, own])];
/// let (kept, stats) = prune_vectors(vectors, 1, &checksums);
///
/// assert_eq!(kept[0].checksums, vec![shared]);
/// assert_eq!(stats.unshared_refs, 1);
/// ```
pub fn prune_vectors(
    vectors: Vec<FileVector>,
    min_blocks: usize,
    checksums: &ChecksumRegistry,
) -> (Vec<FileVector>, PruneStats) {
    let mut stats = PruneStats {
        input_vectors: vectors.len(),
        ..Default::default()
    };

    let kept: Vec<FileVector> = vectors
        .into_iter()
        .filter_map(|mut vector| {
            let before = vector.len();
            vector.checksums.retain(|&id| checksums.count(id) > 1);
            stats.unshared_refs += before - vector.len();

            if vector.len() < min_blocks {
                stats.dropped_vectors += 1;
                log::trace!(
                    "Pruned {}: {} shared blocks < {}",
                    vector.file,
                    vector.len(),
                    min_blocks
                );
                None
            } else {
                Some(vector)
            }
        })
        .collect();
    stats.vectors = kept.len();

    log::info!(
        "Prune: {} vectors -> {} ({} unshared block refs removed, min_blocks={})",
        stats.input_vectors,
        stats.vectors,
        stats.unshared_refs,
        min_blocks
    );

    (kept, stats)
}
