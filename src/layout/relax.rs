use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::clustering::{ClusterId, Item};

/// Live cluster ids in the order they first appear in the item table.
pub fn cluster_order(items: &[Item]) -> Vec<ClusterId> {
    let mut order = Vec::new();
    for item in items {
        if let Some(id) = item.cluster_id {
            if !order.contains(&id) {
                order.push(id);
            }
        }
    }
    order
}

/// Mean member position per cluster, in `order` order.
pub fn cluster_centroids(items: &[Item], order: &[ClusterId]) -> Vec<[f64; 2]> {
    order
        .iter()
        .map(|&id| {
            let mut sum = [0.0, 0.0];
            let mut count = 0usize;
            for item in items.iter().filter(|i| i.cluster_id == Some(id)) {
                sum[0] += item.position[0];
                sum[1] += item.position[1];
                count += 1;
            }
            if count > 0 {
                [sum[0] / count as f64, sum[1] / count as f64]
            } else {
                [0.0, 0.0]
            }
        })
        .collect()
}

/// Pairwise centroid repulsion. For every pair closer than
/// `min_distance`, pushes the two centroids apart along their
/// connecting vector by `rate * (min_distance - distance)`, split
/// symmetrically. A force pass, not a global optimizer: residual
/// violations are possible when clusters are numerous or packed.
pub fn relax_centroids(
    centroids: &mut [[f64; 2]],
    min_distance: f64,
    iterations: usize,
    rate: f64,
) {
    for _ in 0..iterations {
        for i in 0..centroids.len() {
            for j in (i + 1)..centroids.len() {
                let dx = centroids[j][0] - centroids[i][0];
                let dy = centroids[j][1] - centroids[i][1];
                let distance = (dx * dx + dy * dy).sqrt();
                if distance >= min_distance {
                    continue;
                }
                // Coincident centroids have no direction; separate
                // along the x axis.
                let (ux, uy) = if distance > 1e-9 {
                    (dx / distance, dy / distance)
                } else {
                    (1.0, 0.0)
                };
                let push = rate * (min_distance - distance) / 2.0;
                centroids[i][0] -= ux * push;
                centroids[i][1] -= uy * push;
                centroids[j][0] += ux * push;
                centroids[j][1] += uy * push;
            }
        }
    }
}

/// Translates every cluster's members by the delta between its relaxed
/// centroid and its pre-relaxation mean, then adds independent
/// isotropic Gaussian jitter per point so no two members coincide.
pub fn translate_and_jitter(
    items: &mut [Item],
    order: &[ClusterId],
    original: &[[f64; 2]],
    relaxed: &[[f64; 2]],
    jitter_scale: f64,
    rng: &mut StdRng,
) {
    let jitter = if jitter_scale > 0.0 {
        Normal::new(0.0, jitter_scale).ok()
    } else {
        None
    };

    for (index, &id) in order.iter().enumerate() {
        let shift = [
            relaxed[index][0] - original[index][0],
            relaxed[index][1] - original[index][1],
        ];
        for item in items.iter_mut().filter(|i| i.cluster_id == Some(id)) {
            item.position[0] += shift[0];
            item.position[1] += shift[1];
            if let Some(normal) = &jitter {
                item.position[0] += normal.sample(rng);
                item.position[1] += normal.sample(rng);
            }
        }
    }
}
