use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use blockdedupe::analyzer::Analyzer;
use blockdedupe::graph::{
    find_conflicts, BipartiteGraph, DedupeGroup, PartitionConfig, PartitionError, Partitioner,
};
use blockdedupe::records::{identify_duplicates, BlockRecord, DuplicateMap, WholeFileRecord};
use blockdedupe::registry::{BlockRange, ChecksumRegistry, Fingerprint, Registry};
use blockdedupe::report::ResolvedGroup;
use blockdedupe::vectors::{build_vectors, prune_vectors};

/// Up to eight files, each holding a handful of blocks drawn from a small
/// pool of hashes and ranges so that sharing and range conflicts are common.
fn records_strategy() -> impl Strategy<Value = Vec<BlockRecord>> {
    prop::collection::vec((0u8..8, 0u8..5, 0u64..4), 0..60).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(file, hash, slot)| block(file, hash, slot))
            .collect()
    })
}

/// Like [`records_strategy`], but only the first slot varies its hash, so no
/// component ever has more than one conflicting range.
fn single_conflict_strategy() -> impl Strategy<Value = Vec<BlockRecord>> {
    prop::collection::vec((0u8..8, 0u8..3, 0u64..4), 0..60).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(file, variant, slot)| {
                let hash = if slot == 0 { variant } else { 0x10 + slot as u8 };
                block(file, hash, slot)
            })
            .collect()
    })
}

fn block(file: u8, hash: u8, slot: u64) -> BlockRecord {
    let start = slot * 100;
    BlockRecord::new(
        Fingerprint::new(format!("{hash:02x}"), BlockRange::new(start, start + 99)),
        format!("/f{file}"),
    )
}

fn partition_records(
    records: Vec<BlockRecord>,
) -> (Registry, BipartiteGraph, Result<Vec<DedupeGroup>, PartitionError>) {
    let mut registry = Registry::new();
    let (vectors, _) = build_vectors(records, &DuplicateMap::new(), &mut registry);
    let (vectors, _) = prune_vectors(vectors, 2, &registry.checksums);
    let graph = BipartiteGraph::from_vectors(&vectors);

    let config = PartitionConfig::default().with_parallel(false);
    let result = Partitioner::new(&registry.checksums, config)
        .partition(&graph)
        .map(|(groups, _)| groups);
    (registry, graph, result)
}

fn check_tree(groups: &[DedupeGroup], checksums: &ChecksumRegistry) -> Result<(), TestCaseError> {
    let mut seen_files = BTreeSet::new();
    for group in groups {
        prop_assert!(group.files.len() >= 2);
        for file in &group.files {
            // Top-level groups never share files
            prop_assert!(seen_files.insert(*file));
        }
        check_group(group, checksums)?;
    }
    Ok(())
}

fn check_group(group: &DedupeGroup, checksums: &ChecksumRegistry) -> Result<(), TestCaseError> {
    let mut sub_files = BTreeSet::new();
    let mut sub_csums = BTreeSet::new();
    let mut sub_savings = 0;
    for sub in &group.subgroups {
        sub_files.extend(sub.files.iter().copied());
        sub_csums.extend(sub.csums.iter().copied());
        sub_savings += sub.savings;
        check_group(sub, checksums)?;
    }

    for &csum in &group.csums {
        prop_assert!(checksums.count(csum) >= 2);
    }
    prop_assert!(group.selected_files.is_disjoint(&sub_files));
    let rebuilt: BTreeSet<_> = group.selected_files.union(&sub_files).copied().collect();
    prop_assert_eq!(&rebuilt, &group.files);
    let rebuilt: BTreeSet<_> = group.selected_csums.union(&sub_csums).copied().collect();
    prop_assert_eq!(&rebuilt, &group.csums);
    prop_assert!(group.savings >= sub_savings);

    let conflicts = find_conflicts(group.selected_csums.iter().copied(), checksums);
    prop_assert!(!conflicts.has_conflicts());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct Shape {
    files: Vec<String>,
    selected_csums: Vec<Fingerprint>,
    savings: u64,
    children: Vec<Shape>,
}

fn shape(group: &ResolvedGroup) -> Shape {
    Shape {
        files: group.files.clone(),
        selected_csums: group.selected_csums.clone(),
        savings: group.savings,
        children: group.subgroups.iter().map(shape).collect(),
    }
}

proptest! {
    #[test]
    fn test_single_conflicting_range_always_partitions(records in single_conflict_strategy()) {
        let (registry, _, result) = partition_records(records);
        let groups = result.map_err(|e| TestCaseError::fail(format!("partition failed: {e}")))?;
        check_tree(&groups, &registry.checksums)?;
    }

    #[test]
    fn test_group_tree_invariants(records in records_strategy()) {
        let (registry, graph, result) = partition_records(records);
        match result {
            Ok(groups) => check_tree(&groups, &registry.checksums)?,
            Err(PartitionError::InternalInvariantViolation { detail, .. }) => {
                // Only raised when the paths of two or more conflicting
                // ranges have no edge in common.
                let ranges: usize = detail
                    .strip_suffix(" conflicting ranges share no path edge")
                    .and_then(|count| count.parse().ok())
                    .ok_or_else(|| TestCaseError::fail(format!("unexpected violation: {detail}")))?;
                prop_assert!(ranges >= 2);

                let widest = graph
                    .connected_components()
                    .iter()
                    .map(|component| {
                        let csums = component.iter().filter_map(|n| n.as_checksum());
                        find_conflicts(csums, &registry.checksums).ranges.len()
                    })
                    .max()
                    .unwrap_or(0);
                prop_assert!(widest >= 2);
            }
            Err(other) => return Err(TestCaseError::fail(other.to_string())),
        }
    }

    #[test]
    fn test_input_order_does_not_change_split_tree(records in single_conflict_strategy()) {
        let analyzer = Analyzer::with_defaults().with_parallel(false);
        let mut reversed = records.clone();
        reversed.reverse();

        let (forward, _) = analyzer
            .analyze(&DuplicateMap::new(), records)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let (backward, _) = analyzer
            .analyze(&DuplicateMap::new(), reversed)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let forward: Vec<Shape> = forward.iter().map(shape).collect();
        let backward: Vec<Shape> = backward.iter().map(shape).collect();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn test_input_order_does_not_change_tree(records in records_strategy()) {
        let analyzer = Analyzer::with_defaults().with_parallel(false);
        let forward = analyzer.analyze(&DuplicateMap::new(), records.clone());
        let mut reversed = records;
        reversed.reverse();
        let backward = analyzer.analyze(&DuplicateMap::new(), reversed);

        match (forward, backward) {
            (Ok((a, _)), Ok((b, _))) => {
                let a: Vec<Shape> = a.iter().map(shape).collect();
                let b: Vec<Shape> = b.iter().map(shape).collect();
                prop_assert_eq!(a, b);
            }
            (Err(_), Err(_)) => {}
            (a, b) => {
                return Err(TestCaseError::fail(format!(
                    "outcome depends on order: {:?} vs {:?}",
                    a.is_ok(),
                    b.is_ok()
                )));
            }
        }
    }

    #[test]
    fn test_identify_duplicates_invariants(
        entries in prop::collection::vec((0u8..6, 0u8..20), 0..40)
    ) {
        let records: Vec<WholeFileRecord> = entries
            .iter()
            .map(|(hash, file)| WholeFileRecord {
                hash: format!("{hash:02x}"),
                file: format!("/w{file}"),
            })
            .collect();
        let sets = identify_duplicates(&records);

        let mut by_hash: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &records {
            *by_hash.entry(record.hash.as_str()).or_default() += 1;
        }

        for set in &sets {
            prop_assert!(set.files.len() >= 2);
            prop_assert_eq!(set.files.len(), by_hash[set.hash.as_str()]);
            let first = records.iter().find(|r| r.hash == set.hash).map(|r| r.file.as_str());
            prop_assert_eq!(set.primary(), first);
        }
        let expected_sets = by_hash.values().filter(|&&n| n >= 2).count();
        prop_assert_eq!(sets.len(), expected_sets);

        let map = DuplicateMap::from_sets(&sets);
        for set in &sets {
            for secondary in set.secondaries() {
                prop_assert!(map.is_duplicate(secondary));
            }
        }
    }
}
