pub mod overlap;
pub mod relax;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clustering::{ClusterTable, Item};
use crate::TARGET_LAYOUT;

pub use overlap::{check_overlap, resolve_overlaps};
pub use relax::{cluster_centroids, cluster_order, relax_centroids};

/// What to do when two clusters still overlap after relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Nudge the second cluster by a random displacement and re-check,
    /// up to the retry bound.
    Nudge { max_retries: usize },
    /// Treat overlap as redundancy and merge the second cluster's
    /// membership into the first.
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Multiplier applied to raw projection coordinates so the visual
    /// spread is legible. Deployments have used 400-1000.
    pub projection_scale: f64,
    /// Minimum distance between cluster centroids after relaxation.
    pub min_centroid_distance: f64,
    /// Number of centroid repulsion passes.
    pub relax_iterations: usize,
    /// Fraction of the centroid-distance violation corrected per pass.
    pub relax_rate: f64,
    /// Standard deviation of the per-point Gaussian jitter.
    pub jitter_scale: f64,
    /// Two clusters overlap when any cross-cluster point pair is
    /// closer than this.
    pub min_point_distance: f64,
    pub overlap_policy: OverlapPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            projection_scale: 500.0,
            min_centroid_distance: 5.0,
            relax_iterations: 100,
            relax_rate: 0.1,
            jitter_scale: 0.5,
            min_point_distance: 5.0,
            overlap_policy: OverlapPolicy::Nudge { max_retries: 5 },
        }
    }
}

/// Runs the full layout pass over projected positions.
///
/// Steps, in order: rescale the raw projection, relax cluster
/// centroids apart, translate each cluster's members by its centroid
/// delta plus per-point jitter, then detect and resolve residual
/// overlap according to the configured policy. Overlap resolution is
/// best-effort; residual violations are logged, not fatal.
pub fn space_out_clusters(
    items: &mut [Item],
    table: &mut ClusterTable,
    config: &LayoutConfig,
    rng: &mut StdRng,
) {
    if items.is_empty() {
        return;
    }

    for item in items.iter_mut() {
        item.position[0] *= config.projection_scale;
        item.position[1] *= config.projection_scale;
    }

    let order = cluster_order(items);
    let original = cluster_centroids(items, &order);
    let mut centroids = original.clone();
    relax_centroids(
        &mut centroids,
        config.min_centroid_distance,
        config.relax_iterations,
        config.relax_rate,
    );

    relax::translate_and_jitter(items, &order, &original, &centroids, config.jitter_scale, rng);

    let unresolved = resolve_overlaps(items, table, config, rng);
    if unresolved > 0 {
        info!(
            target: TARGET_LAYOUT,
            "{} cluster pairs still overlap after resolution", unresolved
        );
    }
}
