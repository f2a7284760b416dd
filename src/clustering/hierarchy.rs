use tracing::info;

use crate::clustering::merging::merge_clusters;
use crate::clustering::types::{ClusterId, ClusterTable, Item};
use crate::vector::squared_euclidean_distance;
use crate::TARGET_CLUSTERING;

/// Parameters for the depth-bounded hierarchical strategy.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyParams {
    pub max_cluster_depth: usize,
    pub min_nodes_per_cluster: usize,
}

/// Binary merge tree produced by agglomerative linkage.
///
/// Leaves are `0..leaf_count`; the internal node created by merge step
/// `s` has index `leaf_count + s`.
#[derive(Debug)]
pub struct LinkageTree {
    pub leaf_count: usize,
    pub merges: Vec<(usize, usize)>,
}

impl LinkageTree {
    pub fn root(&self) -> usize {
        if self.merges.is_empty() {
            0
        } else {
            self.leaf_count + self.merges.len() - 1
        }
    }
}

/// Computes a Ward-linkage agglomerative clustering over the
/// embeddings, producing a binary merge tree whose leaves are the
/// original items.
///
/// Merge costs follow the Lance-Williams update over squared Euclidean
/// distances. Ties are broken by scanning pairs in index order, so the
/// tree is stable for a fixed input order.
pub fn ward_linkage(embeddings: &[Vec<f32>]) -> LinkageTree {
    let n = embeddings.len();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    if n < 2 {
        return LinkageTree {
            leaf_count: n,
            merges,
        };
    }

    // Active clusters: arena node index and leaf count.
    let mut active: Vec<(usize, usize)> = (0..n).map(|i| (i, 1)).collect();
    let mut dist: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| f64::from(squared_euclidean_distance(&embeddings[i], &embeddings[j])))
                .collect()
        })
        .collect();

    for step in 0..(n - 1) {
        // Closest active pair, first in scan order on ties.
        let mut best = (0usize, 1usize);
        let mut best_dist = f64::INFINITY;
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                if dist[i][j] < best_dist {
                    best_dist = dist[i][j];
                    best = (i, j);
                }
            }
        }
        let (i, j) = best;
        let (node_i, size_i) = active[i];
        let (node_j, size_j) = active[j];
        merges.push((node_i, node_j));

        // Lance-Williams update for Ward linkage, written into slot i.
        let merged_size = size_i + size_j;
        let d_ij = dist[i][j];
        for k in 0..active.len() {
            if k == i || k == j {
                continue;
            }
            let size_k = active[k].1 as f64;
            let total = (merged_size + active[k].1) as f64;
            let updated = ((size_i as f64 + size_k) * dist[i][k]
                + (size_j as f64 + size_k) * dist[j][k]
                - size_k * d_ij)
                / total;
            dist[i][k] = updated;
            dist[k][i] = updated;
        }
        active[i] = (n + step, merged_size);

        // Drop slot j, preserving scan order for determinism.
        active.remove(j);
        dist.remove(j);
        for row in dist.iter_mut() {
            row.remove(j);
        }
    }

    LinkageTree {
        leaf_count: n,
        merges,
    }
}

struct WalkState<'a> {
    table: &'a mut ClusterTable,
    assignments: &'a mut Vec<Option<ClusterId>>,
    labels: &'a [String],
    params: HierarchyParams,
    root_bucket: Option<ClusterId>,
}

impl WalkState<'_> {
    fn ensure_root_bucket(&mut self) -> ClusterId {
        match self.root_bucket {
            Some(id) => id,
            None => {
                let id = self.table.allocate(None, 0);
                self.root_bucket = Some(id);
                id
            }
        }
    }
}

/// Builds the depth-bounded cluster table for the hierarchical
/// strategy and returns it with the per-item assignments.
///
/// The agglomeration tree is walked top-down: internal nodes at
/// `max_cluster_depth` open a fresh cluster, nodes above it pass the
/// enclosing cluster id through, and leaves attach to the nearest
/// opened ancestor. After both children of a node return, an
/// undersized combined membership is folded into the parent cluster,
/// which bounds minimum cluster size without a second pass. Items with
/// no opened ancestor land in a root bucket cluster.
pub fn assign_clusters(items: &[Item], params: HierarchyParams) -> (ClusterTable, Vec<ClusterId>) {
    let labels: Vec<String> = items.iter().map(|item| item.label.clone()).collect();
    let embeddings: Vec<Vec<f32>> = items.iter().map(|item| item.embedding.clone()).collect();

    let tree = ward_linkage(&embeddings);
    let mut table = ClusterTable::new();
    let mut assignments: Vec<Option<ClusterId>> = vec![None; items.len()];

    if !items.is_empty() {
        let mut state = WalkState {
            table: &mut table,
            assignments: &mut assignments,
            labels: &labels,
            params,
            root_bucket: None,
        };
        walk(&tree, tree.root(), None, 0, &mut state);

        // Leaves that never passed a cluster boundary fall into the
        // root bucket so every item resolves to a live cluster.
        let unassigned: Vec<usize> = state
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(i, _)| i)
            .collect();
        if !unassigned.is_empty() {
            let bucket = state.ensure_root_bucket();
            for index in unassigned {
                state.assignments[index] = Some(bucket);
                let label = state.labels[index].clone();
                if let Some(node) = state.table.get_mut(bucket) {
                    node.member_labels.push(label);
                }
            }
        }
    }

    info!(
        target: TARGET_CLUSTERING,
        "Hierarchical clustering produced {} live clusters for {} items",
        table.len(),
        items.len()
    );

    let assignments = assignments
        .into_iter()
        .map(|a| a.expect("every item assigned after root-bucket pass"))
        .collect();
    (table, assignments)
}

/// Post-order walk over the linkage tree. Returns the cluster id this
/// subtree reports upward (if any) and the subtree's leaf count.
fn walk(
    tree: &LinkageTree,
    node: usize,
    parent_id: Option<ClusterId>,
    depth: usize,
    state: &mut WalkState<'_>,
) -> (Option<ClusterId>, usize) {
    // Leaf: attribute to the nearest opened ancestor, if one exists.
    if node < tree.leaf_count {
        state.assignments[node] = parent_id;
        if let Some(pid) = parent_id {
            let label = state.labels[node].clone();
            if let Some(cluster) = state.table.get_mut(pid) {
                cluster.member_labels.push(label);
            }
        }
        return (None, 1);
    }

    let (left, right) = tree.merges[node - tree.leaf_count];

    if depth == state.params.max_cluster_depth {
        // Cluster boundary: open a fresh cluster for this subtree.
        let id = state.table.allocate(parent_id, depth);
        let (left_id, left_count) = walk(tree, left, Some(id), depth + 1, state);
        let (right_id, right_count) = walk(tree, right, Some(id), depth + 1, state);
        for child in [left_id, right_id].into_iter().flatten() {
            if child != id {
                if let Some(cluster) = state.table.get_mut(id) {
                    cluster.children.push(child);
                }
            }
        }
        let count = left_count + right_count;
        if count < state.params.min_nodes_per_cluster {
            // Undersized cluster: fold it into the enclosing cluster,
            // or the root bucket when there is none.
            let target = match parent_id {
                Some(pid) => pid,
                None => state.ensure_root_bucket(),
            };
            if target != id {
                merge_clusters(state.table, state.assignments, target, id);
                return (Some(target), count);
            }
        }
        (Some(id), count)
    } else {
        let (left_id, left_count) = walk(tree, left, parent_id, depth + 1, state);
        let (right_id, right_count) = walk(tree, right, parent_id, depth + 1, state);
        let count = left_count + right_count;

        if (left_id.is_some() || right_id.is_some()) && count < state.params.min_nodes_per_cluster {
            let target = match parent_id {
                Some(pid) => pid,
                None => state.ensure_root_bucket(),
            };
            for child in [left_id, right_id].into_iter().flatten() {
                merge_clusters(state.table, state.assignments, target, child);
            }
            return (Some(target), count);
        }

        (parent_id, count)
    }
}
