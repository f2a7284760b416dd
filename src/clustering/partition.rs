use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::clustering::types::{ClusterId, ClusterTable, Item};
use crate::vector::squared_euclidean_distance;
use crate::TARGET_CLUSTERING;

/// Parameters for the flat partition strategy.
#[derive(Debug, Clone, Copy)]
pub struct PartitionParams {
    pub min_clusters: usize,
    pub max_clusters: usize,
    pub min_nodes_per_cluster: usize,
    pub seed: u64,
}

const MAX_KMEANS_ITERATIONS: usize = 100;

/// Data-size-driven cluster count:
/// `clamp(max(min_clusters, n / min_nodes_per_cluster), min_clusters, max_clusters)`,
/// additionally capped at the item count so every centroid can own a point.
pub fn cluster_count(item_count: usize, params: &PartitionParams) -> usize {
    let derived = (item_count / params.min_nodes_per_cluster.max(1)).max(params.min_clusters);
    derived
        .clamp(params.min_clusters, params.max_clusters.max(params.min_clusters))
        .min(item_count)
        .max(1)
}

/// Partitions items into k clusters directly, without building a tree.
///
/// Uses seeded k-means (k-means++ initialization, standard
/// nearest-centroid assignment) so a fixed seed reproduces the same
/// partition. Returns the cluster table and per-item assignments.
pub fn assign_clusters(items: &[Item], params: PartitionParams) -> (ClusterTable, Vec<ClusterId>) {
    let mut table = ClusterTable::new();
    if items.is_empty() {
        return (table, Vec::new());
    }

    let embeddings: Vec<&[f32]> = items.iter().map(|item| item.embedding.as_slice()).collect();
    let k = cluster_count(items.len(), &params);
    let labels = kmeans(&embeddings, k, params.seed);

    info!(
        target: TARGET_CLUSTERING,
        "Flat partition produced {} clusters for {} items",
        k,
        items.len()
    );

    // One table node per partition; the small-integer partition index
    // doubles as the cluster id.
    let ids: Vec<ClusterId> = (0..k).map(|_| table.allocate(None, 0)).collect();
    let assignments: Vec<ClusterId> = labels.iter().map(|&l| ids[l]).collect();
    for (item, &id) in items.iter().zip(assignments.iter()) {
        if let Some(node) = table.get_mut(id) {
            node.member_labels.push(item.label.clone());
        }
    }
    (table, assignments)
}

fn kmeans(vectors: &[&[f32]], k: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = plus_plus_init(vectors, k, &mut rng);
    let mut labels = vec![0usize; vectors.len()];

    for _ in 0..MAX_KMEANS_ITERATIONS {
        let mut changed = false;
        for (index, vector) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(vector, &centroids);
            if labels[index] != nearest {
                labels[index] = nearest;
                changed = true;
            }
        }

        // Recompute centroids as member means; an emptied centroid
        // keeps its previous position.
        let dims = vectors[0].len();
        let mut sums = vec![vec![0.0f32; dims]; k];
        let mut counts = vec![0usize; k];
        for (index, vector) in vectors.iter().enumerate() {
            let label = labels[index];
            counts[label] += 1;
            for (d, value) in vector.iter().enumerate() {
                sums[label][d] += value;
            }
        }
        for (centroid, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(counts.iter())) {
            if *count > 0 {
                for (d, value) in centroid.iter_mut().enumerate() {
                    *value = sum[d] / *count as f32;
                }
            }
        }

        if !changed {
            break;
        }
    }

    labels
}

/// K-means++ initialization: first centroid uniform, the rest weighted
/// by squared distance to the nearest chosen centroid.
fn plus_plus_init(vectors: &[&[f32]], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    let first = rng.random_range(0..vectors.len());
    centroids.push(vectors[first].to_vec());

    for _ in 1..k {
        let weights: Vec<f32> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| squared_euclidean_distance(v, c))
                    .fold(f32::MAX, f32::min)
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            // All points coincide with centroids; fall back to uniform.
            let index = rng.random_range(0..vectors.len());
            centroids.push(vectors[index].to_vec());
            continue;
        }

        let threshold = rng.random::<f32>() * total;
        let mut cumulative = 0.0;
        let mut selected = vectors.len() - 1;
        for (index, &weight) in weights.iter().enumerate() {
            cumulative += weight;
            if cumulative >= threshold {
                selected = index;
                break;
            }
        }
        centroids.push(vectors[selected].to_vec());
    }

    centroids
}

/// Standard nearest-centroid rule; equidistant ties go to the lowest
/// centroid index.
fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean_distance(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_clusters: usize, max_clusters: usize, min_nodes: usize) -> PartitionParams {
        PartitionParams {
            min_clusters,
            max_clusters,
            min_nodes_per_cluster: min_nodes,
            seed: 42,
        }
    }

    #[test]
    fn cluster_count_follows_data_size_heuristic() {
        // 100 items / 10 per cluster = 10, within [2, 20].
        assert_eq!(cluster_count(100, &params(2, 20, 10)), 10);
        // Heuristic below the floor clamps up.
        assert_eq!(cluster_count(12, &params(7, 20, 10)), 7);
        // Heuristic above the ceiling clamps down.
        assert_eq!(cluster_count(1000, &params(2, 20, 10)), 20);
        // Never more clusters than items.
        assert_eq!(cluster_count(3, &params(7, 20, 10)), 3);
    }

    #[test]
    fn partition_is_reproducible_for_a_fixed_seed() {
        let items: Vec<Item> = (0..30)
            .map(|i| {
                Item::new(
                    format!("item-{i}"),
                    vec![(i % 3) as f32 * 8.0, (i % 3) as f32 * -4.0, i as f32 * 0.001],
                    String::new(),
                )
            })
            .collect();
        let (_, first) = assign_clusters(&items, params(2, 10, 10));
        let (_, second) = assign_clusters(&items, params(2, 10, 10));
        assert_eq!(first, second);
    }

    #[test]
    fn well_separated_groups_land_in_distinct_clusters() {
        let items: Vec<Item> = (0..20)
            .map(|i| {
                let base = if i < 10 { 0.0 } else { 100.0 };
                Item::new(
                    format!("item-{i}"),
                    vec![base + (i % 10) as f32 * 0.01, base],
                    String::new(),
                )
            })
            .collect();
        let (table, assignments) = assign_clusters(&items, params(2, 2, 10));
        assert_eq!(table.len(), 2);
        let first_group = assignments[0];
        assert!(assignments[..10].iter().all(|&a| a == first_group));
        assert!(assignments[10..].iter().all(|&a| a != first_group));
    }
}
