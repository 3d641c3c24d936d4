//! Property-based tests for graph building and resolution.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated forests, clean and dirty.

use proptest::prelude::*;

use category_graph::{
    normalize_handle, CategoryGraphBuilder, CategoryGraphIndex, CategoryId, CategoryRecord,
    HierarchyQueries, SlugResolver, MAX_CATEGORY_DEPTH,
};

/// One generated node: parent choice, rank, product count, handle bucket,
/// handle style.
type NodeSpec = (Option<prop::sample::Index>, i64, u64, u8, u8);

/// Raw upstream handle for a bucket. Styles cover mixed case, padding and
/// non-ASCII letters.
fn raw_handle(bucket: u8, style: u8) -> String {
    match style {
        0 => format!("h{}", bucket),
        1 => format!("H{}", bucket),
        2 => format!("  Bébé-{} ", bucket),
        _ => format!("ÉTÉ{}", bucket),
    }
}

/// Strategy for well-formed forests within the depth limit.
///
/// Node `i` may only point at an earlier node, so there are no cycles. Handles
/// come from a small alphabet so they repeat across subtrees.
fn forest() -> impl Strategy<Value = Vec<CategoryRecord>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.8, any::<prop::sample::Index>()),
            -3i64..3,
            0u64..50,
            0u8..6,
            0u8..4,
        ),
        1..40,
    )
    .prop_map(|nodes: Vec<NodeSpec>| {
        let mut records: Vec<CategoryRecord> = Vec::with_capacity(nodes.len());
        for (i, (parent, rank, count, bucket, style)) in nodes.into_iter().enumerate() {
            let id = format!("c{:03}", i);
            let handle = raw_handle(bucket, style);
            let eligible: Vec<usize> = (0..i)
                .filter(|&j| records[j].depth < MAX_CATEGORY_DEPTH)
                .collect();
            let mut record = match parent {
                Some(choice) if !eligible.is_empty() => {
                    let p = eligible[choice.index(eligible.len())];
                    let depth = records[p].depth + 1;
                    let parent_id = records[p].id.clone();
                    CategoryRecord::child(id.as_str(), parent_id, id.as_str(), handle, depth, rank, count)
                }
                _ => CategoryRecord::root(id.as_str(), id.as_str(), handle, rank, count),
            };
            // Sibling handles stay unique after normalization so every node
            // has a reachable path
            let taken = records.iter().any(|r| {
                r.parent_id == record.parent_id
                    && normalize_handle(&r.handle) == normalize_handle(&record.handle)
            });
            if taken {
                record.handle = id.clone();
            }
            records.push(record);
        }
        records
    })
}

/// Strategy for arbitrary, possibly broken, parent links and depths.
fn dirty_records() -> impl Strategy<Value = Vec<CategoryRecord>> {
    prop::collection::vec((prop::option::of(0usize..50), 0u32..7, 0u64..10), 1..40).prop_map(
        |nodes| {
            nodes
                .into_iter()
                .enumerate()
                .map(|(i, (parent, depth, count))| {
                    let id = format!("d{:03}", i);
                    let parent_id = parent.map(|p| CategoryId::new(format!("d{:03}", p)));
                    CategoryRecord::new(id.as_str(), id.as_str(), id.as_str(), parent_id, depth, 0, count)
                })
                .collect()
        },
    )
}

fn build(records: &[CategoryRecord]) -> CategoryGraphIndex {
    CategoryGraphBuilder::new().build(records).unwrap()
}

/// Id of the node a path resolves to, if it resolves as canonical.
fn canonical_target(index: &CategoryGraphIndex, path: &str) -> Option<CategoryId> {
    SlugResolver::new(index)
        .resolve_path(path)
        .ok()
        .filter(|r| r.is_valid)
        .map(|r| r.category.id().clone())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every node of a well-formed forest is placed in the tree.
    #[test]
    fn clean_forest_is_fully_placed(records in forest()) {
        let index = build(&records);
        prop_assert_eq!(index.total(), records.len());
        prop_assert_eq!(index.in_tree_count(), records.len());
        prop_assert_eq!(index.diagnostics().excluded_count(), 0);
    }

    /// A node's total is its own count plus its children's totals, and the
    /// roots together account for every product.
    #[test]
    fn totals_are_subtree_sums(records in forest()) {
        let index = build(&records);
        for node in index.flat() {
            let children: u64 = index.children_of(node).map(|c| c.total_product_count).sum();
            prop_assert_eq!(node.total_product_count, node.record.product_count + children);
        }
        let roots: u64 = index.roots().map(|r| r.total_product_count).sum();
        let all: u64 = records.iter().map(|r| r.product_count).sum();
        prop_assert_eq!(roots, all);
    }

    /// Input order never changes the result.
    #[test]
    fn build_is_order_independent(records in forest(), shift in 0usize..40) {
        let reference = build(&records);

        let mut rotated = records.clone();
        let len = rotated.len();
        rotated.rotate_left(shift % len);
        rotated.reverse();
        let index = build(&rotated);

        let ids = |i: &CategoryGraphIndex| -> Vec<String> {
            i.flat().iter().map(|n| n.id().to_string()).collect()
        };
        prop_assert_eq!(ids(&index), ids(&reference));
        prop_assert_eq!(index.fingerprint(), reference.fingerprint());
        prop_assert_eq!(
            serde_json::to_value(index.tree_view()).unwrap(),
            serde_json::to_value(reference.tree_view()).unwrap()
        );
    }

    /// Resolving a node's canonical path lands on a node with that same
    /// canonical path, and the path validates.
    #[test]
    fn canonical_paths_resolve(records in forest()) {
        let index = build(&records);
        let resolver = SlugResolver::new(&index);
        for node in index.flat() {
            let path = index.full_path(node).unwrap();
            let resolution = resolver.resolve_path(&path).unwrap();
            prop_assert!(resolution.is_valid);
            prop_assert_eq!(resolution.category.id(), node.id());
            prop_assert_eq!(resolution.canonical_full_path(), path);
        }
    }

    /// Breadcrumbs run from a root to the node, each extending the last.
    #[test]
    fn breadcrumbs_follow_ancestors(records in forest()) {
        let index = build(&records);
        let queries = HierarchyQueries::new(&index);
        for node in index.flat() {
            let crumbs = queries.breadcrumbs(node.id()).unwrap();
            prop_assert_eq!(crumbs.len(), node.depth() as usize + 1);
            prop_assert_eq!(&crumbs.last().unwrap().id, node.id());
            prop_assert!(index.get(&crumbs[0].id).unwrap().is_root());
            let leaf = canonical_target(&index, &crumbs.last().unwrap().path);
            prop_assert_eq!(leaf.as_ref(), Some(node.id()));
            for pair in crumbs.windows(2) {
                let expected = format!("{}/", pair[0].path);
                prop_assert!(pair[1].path.starts_with(&expected));
            }
        }
    }

    /// Dirty input never fails the build; every record is either placed or
    /// reported, and only placed records count toward root totals.
    #[test]
    fn dirty_input_is_accounted_for(records in dirty_records()) {
        let index = build(&records);
        prop_assert_eq!(index.total(), records.len());
        prop_assert_eq!(
            index.in_tree_count() + index.diagnostics().excluded_count(),
            index.total()
        );

        let placed: u64 = index
            .flat()
            .iter()
            .filter(|n| n.is_in_tree())
            .map(|n| n.record.product_count)
            .sum();
        let roots: u64 = index.roots().map(|r| r.total_product_count).sum();
        prop_assert_eq!(roots, placed);

        for node in index.flat().iter().filter(|n| n.is_in_tree()) {
            prop_assert!(node.depth() <= MAX_CATEGORY_DEPTH);
        }
    }
}
