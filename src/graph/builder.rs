//! Graph construction from a flat record list.
//!
//! ## Algorithm
//!
//! 1. Drop inactive records (when configured), normalize handles, sort canonically, drop duplicate ids
//! 2. Classify every record by walking its parent links (orphan, cycle, too deep, depth mismatch)
//! 3. Attach sound records top-down; a record under an excluded ancestor is detached
//! 4. Build a `parent -> children` adjacency map once, siblings ordered by (rank, name, id)
//! 5. Derive ancestor chains top-down and product totals bottom-up
//! 6. Lay out nodes in flat order (depth, rank, name, id) and index them
//!
//! Every step is linear in the number of records, apart from the bounded
//! parent walk in step 2.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::canonical::records_fingerprint;
use crate::resolver::normalize_handle;
use crate::types::{CategoryError, CategoryId, CategoryNode, CategoryRecord, Placement};
use crate::MAX_CATEGORY_DEPTH;

use super::diagnostics::{BuildDiagnostics, HandleCollision};
use super::index::CategoryGraphIndex;

/// Options controlling graph construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Deepest allowed depth (root = 0).
    pub max_depth: u32,
    /// Drop inactive records before building.
    pub active_only: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_CATEGORY_DEPTH,
            active_only: false,
        }
    }
}

/// Builds a `CategoryGraphIndex` from flat records.
///
/// Building never mutates the input and is deterministic: any permutation of
/// the same record set yields an identical index.
#[derive(Debug, Clone, Default)]
pub struct CategoryGraphBuilder {
    options: BuildOptions,
}

/// Sibling order: rank, then name, then id.
fn sibling_order(a: &CategoryRecord, b: &CategoryRecord) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Flat order: depth, then sibling order.
fn flat_order(a: &CategoryRecord, b: &CategoryRecord) -> Ordering {
    a.depth.cmp(&b.depth).then_with(|| sibling_order(a, b))
}

impl CategoryGraphBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with explicit options.
    pub fn with_options(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Get the options.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the index.
    ///
    /// Fails only with `NoCategories` when nothing is left to build from.
    /// Orphans, cycles and depth problems are excluded from the tree and
    /// reported through `BuildDiagnostics`.
    pub fn build(&self, input: &[CategoryRecord]) -> Result<CategoryGraphIndex, CategoryError> {
        let start = Instant::now();
        let mut diagnostics = BuildDiagnostics::default();

        let mut kept: Vec<CategoryRecord> = Vec::with_capacity(input.len());
        for record in input {
            if self.options.active_only && !record.is_active {
                diagnostics.inactive_skipped += 1;
                continue;
            }
            let mut record = record.clone();
            record.handle = normalize_handle(&record.handle);
            kept.push(record);
        }

        if kept.is_empty() {
            warn!(
                target: "category_graph::build",
                input = input.len(),
                inactive_skipped = diagnostics.inactive_skipped,
                "No categories to build from"
            );
            return Err(CategoryError::NoCategories);
        }

        // Sorting the full record makes duplicate resolution independent of input order.
        kept.sort();
        let mut records: Vec<CategoryRecord> = Vec::with_capacity(kept.len());
        for record in kept {
            if records.last().is_some_and(|last| last.id == record.id) {
                warn!(
                    target: "category_graph::build",
                    category_id = %record.id,
                    "Duplicate category id, keeping first record"
                );
                if diagnostics.duplicate_ids.last() != Some(&record.id) {
                    diagnostics.duplicate_ids.push(record.id);
                }
                continue;
            }
            records.push(record);
        }

        let fingerprint = records_fingerprint(&records);
        let slots: BTreeMap<&CategoryId, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.id, i))
            .collect();

        let mut placements: Vec<Placement> = (0..records.len())
            .map(|i| self.classify(i, &records, &slots))
            .collect();

        // Attach top-down so a parent's final placement is known before its children.
        let mut sound: Vec<usize> = (0..records.len())
            .filter(|&i| placements[i].is_in_tree())
            .collect();
        sound.sort_by_key(|&i| records[i].depth);
        for &i in &sound {
            let Some(parent_id) = records[i].parent_id.as_ref() else {
                continue;
            };
            let parent = slots[parent_id];
            if placements[parent].is_in_tree() {
                continue;
            }
            let excluded_ancestor = match &placements[parent] {
                Placement::Detached { excluded_ancestor } => excluded_ancestor.clone(),
                _ => parent_id.clone(),
            };
            placements[i] = Placement::Detached { excluded_ancestor };
        }

        let mut roots: Vec<usize> = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        for i in 0..records.len() {
            if !placements[i].is_in_tree() {
                continue;
            }
            match records[i].parent_id.as_ref() {
                Some(parent_id) => children[slots[parent_id]].push(i),
                None => roots.push(i),
            }
        }
        roots.sort_by(|&a, &b| sibling_order(&records[a], &records[b]));
        for list in children.iter_mut() {
            list.sort_by(|&a, &b| sibling_order(&records[a], &records[b]));
        }

        diagnostics.duplicate_sibling_handles =
            Self::handle_collisions(&records, &roots, &children);

        let mut ancestors: Vec<Vec<CategoryId>> = vec![Vec::new(); records.len()];
        let mut stack: Vec<usize> = roots.clone();
        while let Some(i) = stack.pop() {
            for &child in &children[i] {
                let mut chain = ancestors[i].clone();
                chain.push(records[i].id.clone());
                ancestors[child] = chain;
                stack.push(child);
            }
        }

        // Post-order: deepest nodes first, so a child's total is final before it is added.
        let mut totals: Vec<u64> = records.iter().map(|r| r.product_count).collect();
        let mut bottom_up: Vec<usize> = (0..records.len())
            .filter(|&i| placements[i].is_in_tree())
            .collect();
        bottom_up.sort_by_key(|&i| std::cmp::Reverse(records[i].depth));
        for &i in &bottom_up {
            if let Some(parent_id) = records[i].parent_id.as_ref() {
                let parent = slots[parent_id];
                totals[parent] = totals[parent].saturating_add(totals[i]);
            }
        }

        let max_depth = (0..records.len())
            .filter(|&i| placements[i].is_in_tree())
            .map(|i| records[i].depth)
            .max()
            .unwrap_or(0);

        self.record_exclusions(&records, &placements, &mut diagnostics);

        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| flat_order(&records[a], &records[b]));
        let mut position = vec![0usize; records.len()];
        for (pos, &i) in order.iter().enumerate() {
            position[i] = pos;
        }

        let child_ids: Vec<Vec<CategoryId>> = children
            .iter()
            .map(|list| list.iter().map(|&c| records[c].id.clone()).collect())
            .collect();
        let root_positions: Vec<usize> = roots.iter().map(|&i| position[i]).collect();

        let mut records: Vec<Option<CategoryRecord>> = records.into_iter().map(Some).collect();
        let mut child_ids = child_ids;
        let mut nodes: Vec<CategoryNode> = Vec::with_capacity(order.len());
        for &i in &order {
            let Some(record) = records[i].take() else {
                continue;
            };
            nodes.push(CategoryNode {
                record,
                children: std::mem::take(&mut child_ids[i]),
                ancestor_ids: std::mem::take(&mut ancestors[i]),
                total_product_count: totals[i],
                placement: placements[i].clone(),
            });
        }

        let index = CategoryGraphIndex::assemble(
            nodes,
            root_positions,
            max_depth,
            self.options.max_depth,
            diagnostics,
            fingerprint,
            Utc::now(),
        );

        info!(
            target: "category_graph::build",
            total = index.total(),
            in_tree = index.in_tree_count(),
            excluded = index.diagnostics().excluded_count(),
            max_depth = index.max_depth(),
            fingerprint = %index.fingerprint(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Category graph built"
        );

        Ok(index)
    }

    /// Classify a record by walking its parent links.
    ///
    /// The walk stops at the root, at a missing parent, or at a revisited
    /// node; the visited set bounds it by the record count.
    fn classify(
        &self,
        i: usize,
        records: &[CategoryRecord],
        slots: &BTreeMap<&CategoryId, usize>,
    ) -> Placement {
        let record = &records[i];
        let mut visited: BTreeSet<usize> = BTreeSet::new();
        visited.insert(i);

        let mut hops: u32 = 0;
        let mut current = i;
        while let Some(parent_id) = records[current].parent_id.as_ref() {
            let Some(&parent) = slots.get(parent_id) else {
                return if current == i {
                    Placement::Orphan {
                        missing_parent: parent_id.clone(),
                    }
                } else {
                    Placement::Detached {
                        excluded_ancestor: records[current].id.clone(),
                    }
                };
            };
            if parent == i {
                return Placement::Cyclic;
            }
            if !visited.insert(parent) {
                // The cycle is above us; we only hang off it.
                return Placement::Detached {
                    excluded_ancestor: records[parent].id.clone(),
                };
            }
            hops = hops.saturating_add(1);
            current = parent;
        }

        if hops > self.options.max_depth {
            Placement::TooDeep { hops }
        } else if hops != record.depth {
            Placement::DepthMismatch {
                declared: record.depth,
                actual: hops,
            }
        } else {
            Placement::InTree
        }
    }

    fn handle_collisions(
        records: &[CategoryRecord],
        roots: &[usize],
        children: &[Vec<usize>],
    ) -> Vec<HandleCollision> {
        let mut collisions = Vec::new();
        let groups = std::iter::once((None, roots)).chain(
            children
                .iter()
                .enumerate()
                .filter(|(_, list)| list.len() > 1)
                .map(|(parent, list)| (Some(parent), list.as_slice())),
        );

        for (parent, siblings) in groups {
            let mut by_handle: BTreeMap<&str, Vec<CategoryId>> = BTreeMap::new();
            for &s in siblings {
                by_handle
                    .entry(records[s].handle.as_str())
                    .or_default()
                    .push(records[s].id.clone());
            }
            for (handle, ids) in by_handle {
                if ids.len() < 2 {
                    continue;
                }
                let parent_id = parent.map(|p| records[p].id.clone());
                warn!(
                    target: "category_graph::build",
                    handle = handle,
                    parent_id = ?parent_id,
                    count = ids.len(),
                    "Sibling categories share a handle, first in sibling order wins"
                );
                collisions.push(HandleCollision {
                    parent_id,
                    handle: handle.to_string(),
                    ids,
                });
            }
        }

        collisions
    }

    fn record_exclusions(
        &self,
        records: &[CategoryRecord],
        placements: &[Placement],
        diagnostics: &mut BuildDiagnostics,
    ) {
        for (record, placement) in records.iter().zip(placements) {
            let id = record.id.clone();
            match placement {
                Placement::InTree => continue,
                Placement::Orphan { missing_parent } => {
                    warn!(
                        target: "category_graph::build",
                        category_id = %id,
                        parent_id = %missing_parent,
                        "Orphan category excluded from tree"
                    );
                    diagnostics.orphans.push(id);
                }
                Placement::Cyclic => {
                    warn!(
                        target: "category_graph::build",
                        category_id = %id,
                        "Category on a parent cycle excluded from tree"
                    );
                    diagnostics.cyclic.push(id);
                }
                Placement::TooDeep { hops } => {
                    warn!(
                        target: "category_graph::build",
                        category_id = %id,
                        hops = *hops,
                        max_depth = self.options.max_depth,
                        "Category deeper than the depth limit excluded from tree"
                    );
                    diagnostics.too_deep.push(id);
                }
                Placement::DepthMismatch { declared, actual } => {
                    warn!(
                        target: "category_graph::build",
                        category_id = %id,
                        declared = *declared,
                        actual = *actual,
                        "Category depth mismatch, excluded from tree"
                    );
                    diagnostics.depth_mismatches.push(id);
                }
                Placement::Detached { excluded_ancestor } => {
                    warn!(
                        target: "category_graph::build",
                        category_id = %id,
                        excluded_ancestor = %excluded_ancestor,
                        "Category below an excluded ancestor, detached from tree"
                    );
                    diagnostics.detached.push(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, parent: Option<&str>, handle: &str, depth: u32, rank: i64, count: u64) -> CategoryRecord {
        CategoryRecord::new(
            id,
            handle.to_uppercase(),
            handle,
            parent.map(CategoryId::from),
            depth,
            rank,
            count,
        )
    }

    fn build(records: &[CategoryRecord]) -> CategoryGraphIndex {
        CategoryGraphBuilder::new().build(records).unwrap()
    }

    #[test]
    fn test_three_level_totals() {
        let index = build(&[
            rec("root", None, "bijoux", 0, 0, 0),
            rec("mid", Some("root"), "colliers", 1, 0, 0),
            rec("leaf1", Some("mid"), "or", 2, 0, 15),
            rec("leaf2", Some("mid"), "argent", 2, 1, 15),
        ]);

        let root = index.get(&"root".into()).unwrap();
        let mid = index.get(&"mid".into()).unwrap();
        assert_eq!(root.total_product_count, 30);
        assert_eq!(mid.total_product_count, 30);
        assert_eq!(index.get(&"leaf1".into()).unwrap().total_product_count, 15);
    }

    #[test]
    fn test_empty_input_is_no_categories() {
        let result = CategoryGraphBuilder::new().build(&[]);
        assert_eq!(result.unwrap_err(), CategoryError::NoCategories);
    }

    #[test]
    fn test_active_only_can_empty_the_set() {
        let builder = CategoryGraphBuilder::with_options(BuildOptions {
            active_only: true,
            ..Default::default()
        });
        let records = vec![rec("a", None, "a", 0, 0, 0).with_active(false)];
        assert_eq!(builder.build(&records).unwrap_err(), CategoryError::NoCategories);
    }

    #[test]
    fn test_active_only_drops_inactive() {
        let builder = CategoryGraphBuilder::with_options(BuildOptions {
            active_only: true,
            ..Default::default()
        });
        let index = builder
            .build(&[
                rec("a", None, "a", 0, 0, 1),
                rec("b", Some("a"), "b", 1, 0, 2).with_active(false),
            ])
            .unwrap();

        assert_eq!(index.total(), 1);
        assert_eq!(index.diagnostics().inactive_skipped, 1);
        assert_eq!(index.get(&"a".into()).unwrap().total_product_count, 1);
    }

    #[test]
    fn test_children_sorted_by_rank_then_name() {
        let index = build(&[
            rec("p", None, "p", 0, 0, 0),
            CategoryRecord::child("c", "p", "Zeta", "zeta", 1, 1, 0),
            CategoryRecord::child("b", "p", "Beta", "beta", 1, 0, 0),
            CategoryRecord::child("a", "p", "Alpha", "alpha", 1, 1, 0),
        ]);

        let parent = index.get(&"p".into()).unwrap();
        let order: Vec<&str> = parent.children.iter().map(|c| c.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_orphan_excluded_but_retained() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 1),
            rec("x", Some("ghost"), "x", 1, 0, 5),
        ]);

        let orphan = index.get(&"x".into()).unwrap();
        assert_eq!(
            orphan.placement,
            Placement::Orphan { missing_parent: "ghost".into() }
        );
        assert_eq!(index.total(), 2);
        assert_eq!(index.in_tree_count(), 1);
        assert_eq!(index.diagnostics().orphans, vec![CategoryId::from("x")]);
        assert_eq!(index.by_handle("x").count(), 1);
    }

    #[test]
    fn test_orphan_subtree_is_detached() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 1),
            rec("x", Some("ghost"), "x", 1, 0, 5),
            rec("y", Some("x"), "y", 2, 0, 5),
        ]);

        assert_eq!(
            index.get(&"y".into()).unwrap().placement,
            Placement::Detached { excluded_ancestor: "x".into() }
        );
        assert_eq!(index.diagnostics().detached, vec![CategoryId::from("y")]);
    }

    #[test]
    fn test_cycle_excluded() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 1),
            rec("b", Some("c"), "b", 1, 0, 1),
            rec("c", Some("b"), "c", 1, 0, 1),
            rec("d", Some("c"), "d", 2, 0, 1),
        ]);

        assert_eq!(index.get(&"b".into()).unwrap().placement, Placement::Cyclic);
        assert_eq!(index.get(&"c".into()).unwrap().placement, Placement::Cyclic);
        assert!(matches!(
            index.get(&"d".into()).unwrap().placement,
            Placement::Detached { .. }
        ));
        assert_eq!(index.diagnostics().cyclic.len(), 2);
        assert_eq!(index.in_tree_count(), 1);
        assert_eq!(index.total(), 4);
    }

    #[test]
    fn test_self_parent_is_cyclic() {
        let index = build(&[rec("a", None, "a", 0, 0, 1), rec("s", Some("s"), "s", 1, 0, 1)]);
        assert_eq!(index.get(&"s".into()).unwrap().placement, Placement::Cyclic);
    }

    #[test]
    fn test_depth_mismatch_excludes_subtree() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 1),
            rec("b", Some("a"), "b", 3, 0, 1),
            rec("c", Some("b"), "c", 2, 0, 1),
        ]);

        assert_eq!(
            index.get(&"b".into()).unwrap().placement,
            Placement::DepthMismatch { declared: 3, actual: 1 }
        );
        assert_eq!(
            index.get(&"c".into()).unwrap().placement,
            Placement::Detached { excluded_ancestor: "b".into() }
        );
        assert_eq!(index.get(&"a".into()).unwrap().total_product_count, 1);
        assert!(index.get(&"a".into()).unwrap().children.is_empty());
    }

    #[test]
    fn test_too_deep_chain() {
        let mut records = vec![rec("n0", None, "n0", 0, 0, 0)];
        for d in 1..=5u32 {
            let id = format!("n{}", d);
            let parent = format!("n{}", d - 1);
            records.push(rec(&id, Some(&parent), &id, d, 0, 1));
        }
        let index = build(&records);

        assert_eq!(index.max_depth(), 4);
        assert_eq!(
            index.get(&"n5".into()).unwrap().placement,
            Placement::TooDeep { hops: 5 }
        );
        assert_eq!(index.get(&"n0".into()).unwrap().total_product_count, 4);
    }

    #[test]
    fn test_duplicate_ids_keep_one() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 1),
            rec("a", None, "a", 0, 0, 2),
        ]);

        assert_eq!(index.total(), 1);
        assert_eq!(index.diagnostics().duplicate_ids, vec![CategoryId::from("a")]);
        // Canonical order keeps the smaller record regardless of input order.
        assert_eq!(index.get(&"a".into()).unwrap().record.product_count, 1);
    }

    #[test]
    fn test_sibling_handle_collision_reported() {
        let index = build(&[
            rec("p", None, "p", 0, 0, 0),
            rec("a", Some("p"), "dup", 1, 0, 0),
            rec("b", Some("p"), "dup", 1, 1, 0),
        ]);

        let collisions = &index.diagnostics().duplicate_sibling_handles;
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].handle, "dup");
        assert_eq!(collisions[0].parent_id, Some(CategoryId::from("p")));
        assert_eq!(collisions[0].ids, vec![CategoryId::from("a"), CategoryId::from("b")]);
    }

    #[test]
    fn test_ancestor_ids_root_to_parent() {
        let index = build(&[
            rec("a", None, "a", 0, 0, 0),
            rec("b", Some("a"), "b", 1, 0, 0),
            rec("c", Some("b"), "c", 2, 0, 0),
        ]);

        let c = index.get(&"c".into()).unwrap();
        assert_eq!(c.ancestor_ids, vec![CategoryId::from("a"), CategoryId::from("b")]);
        assert!(index.get(&"a".into()).unwrap().ancestor_ids.is_empty());
    }

    #[test]
    fn test_flat_order_depth_then_rank() {
        let index = build(&[
            rec("c", Some("a"), "c", 1, 0, 0),
            rec("b", None, "b", 0, 1, 0),
            rec("a", None, "a", 0, 0, 0),
        ]);

        let ids: Vec<&str> = index.flat().iter().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_input_not_mutated() {
        let records = vec![rec("b", Some("a"), "b", 1, 0, 1), rec("a", None, "a", 0, 0, 1)];
        let before = records.clone();
        let _ = build(&records);
        assert_eq!(records, before);
    }

    #[test]
    fn test_handles_normalized_before_indexing() {
        let index = build(&[
            rec("p", None, " Bijoux ", 0, 0, 0),
            rec("a", Some("p"), "Colliers", 1, 0, 0),
            rec("b", Some("p"), "colliers", 1, 1, 0),
        ]);

        let root = index.get(&"p".into()).unwrap();
        assert_eq!(root.handle(), "bijoux");
        assert_eq!(index.by_handle("colliers").count(), 2);
        assert_eq!(index.by_handle("Colliers").count(), 0);

        // Case-only differences still collide between siblings
        let collisions = &index.diagnostics().duplicate_sibling_handles;
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].handle, "colliers");
    }
}
