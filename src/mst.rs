use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clustering::{ClusterId, ClusterTable, Item};
use crate::vector::{cosine_distance_matrix, point_distance_matrix};
use crate::TARGET_CLUSTERING;

/// Which space the per-cluster pairwise distances are computed in.
/// Embedding-space trees reflect semantic structure; layout-space
/// trees reflect what the viewer actually sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MstSpace {
    Embedding,
    Layout,
}

/// One spanning-tree edge within a cluster. Edges never cross
/// clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MstEdge {
    pub cluster_id: ClusterId,
    pub start_label: String,
    pub end_label: String,
}

/// Builds a minimum spanning tree per live cluster and returns the
/// union of all per-cluster edge sets.
///
/// For each cluster with at least two members the full pairwise
/// distance matrix is computed in the configured space and reduced
/// with Prim's algorithm, ties going to matrix iteration order.
/// Clusters with fewer than two members produce no edges.
pub fn extract_mst_edges(items: &[Item], table: &ClusterTable, space: MstSpace) -> Vec<MstEdge> {
    let mut edges = Vec::new();

    for id in table.live_ids() {
        let member_indices: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.cluster_id == Some(id))
            .map(|(index, _)| index)
            .collect();
        if member_indices.len() < 2 {
            continue;
        }

        let matrix = match space {
            MstSpace::Embedding => {
                let embeddings: Vec<Vec<f32>> = member_indices
                    .iter()
                    .map(|&index| items[index].embedding.clone())
                    .collect();
                cosine_distance_matrix(&embeddings)
            }
            MstSpace::Layout => {
                let points: Vec<[f64; 2]> = member_indices
                    .iter()
                    .map(|&index| items[index].position)
                    .collect();
                point_distance_matrix(&points)
            }
        };

        for (a, b) in prim_mst(&matrix) {
            edges.push(MstEdge {
                cluster_id: id,
                start_label: items[member_indices[a]].label.clone(),
                end_label: items[member_indices[b]].label.clone(),
            });
        }
    }

    info!(
        target: TARGET_CLUSTERING,
        "Extracted {} MST edges across {} clusters",
        edges.len(),
        table.len()
    );
    edges
}

/// Prim's algorithm over a dense distance matrix. Returns `n - 1`
/// edges as (in-tree index, joined index) pairs in insertion order.
fn prim_mst(matrix: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let n = matrix.len();
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    if n < 2 {
        return edges;
    }

    let mut in_tree = vec![false; n];
    // best_cost[v] is the cheapest edge from the tree to v, via
    // best_from[v].
    let mut best_cost = vec![f64::INFINITY; n];
    let mut best_from = vec![0usize; n];
    in_tree[0] = true;
    for v in 1..n {
        best_cost[v] = matrix[0][v];
    }

    for _ in 1..n {
        let mut next = usize::MAX;
        let mut next_cost = f64::INFINITY;
        for v in 0..n {
            if !in_tree[v] && best_cost[v] < next_cost {
                next_cost = best_cost[v];
                next = v;
            }
        }
        debug_assert!(next != usize::MAX);
        in_tree[next] = true;
        edges.push((best_from[next], next));

        for v in 0..n {
            if !in_tree[v] && matrix[next][v] < best_cost[v] {
                best_cost[v] = matrix[next][v];
                best_from[v] = next;
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_items(table: &mut ClusterTable, count: usize) -> Vec<Item> {
        let id = table.allocate(None, 0);
        (0..count)
            .map(|i| {
                let mut item = Item::new(format!("item-{i}"), vec![i as f32, 1.0], String::new());
                item.cluster_id = Some(id);
                item.position = [i as f64 * 10.0, 0.0];
                if let Some(node) = table.get_mut(id) {
                    node.member_labels.push(item.label.clone());
                }
                item
            })
            .collect()
    }

    #[test]
    fn prim_on_collinear_points_builds_the_chain() {
        let points = vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [30.0, 0.0]];
        let matrix = point_distance_matrix(&points);
        let edges = prim_mst(&matrix);
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn cluster_of_n_members_yields_n_minus_one_edges() {
        let mut table = ClusterTable::new();
        let items = chain_items(&mut table, 8);
        let edges = extract_mst_edges(&items, &table, MstSpace::Layout);
        assert_eq!(edges.len(), 7);
    }

    #[test]
    fn singleton_and_empty_clusters_yield_no_edges() {
        let mut table = ClusterTable::new();
        let mut items = chain_items(&mut table, 1);
        table.allocate(None, 0); // empty cluster
        items[0].position = [0.0, 0.0];
        let edges = extract_mst_edges(&items, &table, MstSpace::Layout);
        assert!(edges.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut table = ClusterTable::new();
        let items = chain_items(&mut table, 6);
        let first = extract_mst_edges(&items, &table, MstSpace::Embedding);
        let second = extract_mst_edges(&items, &table, MstSpace::Embedding);
        assert_eq!(first, second);
    }

    #[test]
    fn edges_never_cross_clusters() {
        let mut table = ClusterTable::new();
        let a = table.allocate(None, 0);
        let b = table.allocate(None, 0);
        let mut items = Vec::new();
        for i in 0..6 {
            let id = if i < 3 { a } else { b };
            let mut item = Item::new(format!("item-{i}"), vec![i as f32, 0.5], String::new());
            item.cluster_id = Some(id);
            item.position = [i as f64, 0.0];
            if let Some(node) = table.get_mut(id) {
                node.member_labels.push(item.label.clone());
            }
            items.push(item);
        }
        let edges = extract_mst_edges(&items, &table, MstSpace::Layout);
        assert_eq!(edges.len(), 4);
        let first_cluster_labels = ["item-0", "item-1", "item-2"];
        for edge in edges.iter().filter(|e| e.cluster_id == a) {
            assert!(first_cluster_labels.contains(&edge.start_label.as_str()));
            assert!(first_cluster_labels.contains(&edge.end_label.as_str()));
        }
    }
}
