use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, warn};

use crate::clustering::{merge_clusters, ClusterId, ClusterTable, Item};
use crate::layout::relax::cluster_order;
use crate::layout::{LayoutConfig, OverlapPolicy};
use crate::TARGET_LAYOUT;

/// Two clusters overlap when any pair of their member points lies
/// closer than `min_point_distance`.
pub fn check_overlap(
    items: &[Item],
    first: ClusterId,
    second: ClusterId,
    min_point_distance: f64,
) -> bool {
    let threshold = min_point_distance * min_point_distance;
    for a in items.iter().filter(|i| i.cluster_id == Some(first)) {
        for b in items.iter().filter(|i| i.cluster_id == Some(second)) {
            let dx = a.position[0] - b.position[0];
            let dy = a.position[1] - b.position[1];
            if dx * dx + dy * dy < threshold {
                return true;
            }
        }
    }
    false
}

/// Walks every live cluster pair and resolves residual overlap
/// according to the configured policy. Returns the number of pairs
/// left overlapping after resolution.
pub fn resolve_overlaps(
    items: &mut [Item],
    table: &mut ClusterTable,
    config: &LayoutConfig,
    rng: &mut StdRng,
) -> usize {
    let order = cluster_order(items);
    let mut unresolved = 0;

    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            let (first, second) = (order[i], order[j]);
            // A merge earlier in the pass may have retired either id.
            if !table.contains(first) || !table.contains(second) {
                continue;
            }
            if !check_overlap(items, first, second, config.min_point_distance) {
                continue;
            }

            match config.overlap_policy {
                OverlapPolicy::Nudge { max_retries } => {
                    if !nudge_apart(items, first, second, config, max_retries, rng) {
                        warn!(
                            target: TARGET_LAYOUT,
                            "Clusters {} and {} still overlap after {} nudges",
                            first,
                            second,
                            max_retries
                        );
                        unresolved += 1;
                    }
                }
                OverlapPolicy::Merge => {
                    debug!(
                        target: TARGET_LAYOUT,
                        "Merging overlapping cluster {} into {}", second, first
                    );
                    merge_by_overlap(items, table, first, second);
                }
            }
        }
    }

    unresolved
}

/// Applies a random displacement to the second cluster's members and
/// re-checks, up to `max_retries` attempts. Returns whether the
/// overlap was cleared.
fn nudge_apart(
    items: &mut [Item],
    first: ClusterId,
    second: ClusterId,
    config: &LayoutConfig,
    max_retries: usize,
    rng: &mut StdRng,
) -> bool {
    let scale = config.min_point_distance.max(1.0);
    let Ok(normal) = Normal::new(0.0, scale) else {
        return false;
    };

    for _ in 0..max_retries {
        let displacement = [normal.sample(rng), normal.sample(rng)];
        for item in items.iter_mut().filter(|i| i.cluster_id == Some(second)) {
            item.position[0] += displacement[0];
            item.position[1] += displacement[1];
        }
        if !check_overlap(items, first, second, config.min_point_distance) {
            return true;
        }
    }
    false
}

/// Layout-driven merge: reassigns all items of the second cluster to
/// the first cluster's id and retires the second id. Coarser than the
/// size-driven merge-up in the hierarchy builder and applied after
/// clustering already ran.
pub fn merge_by_overlap(
    items: &mut [Item],
    table: &mut ClusterTable,
    first: ClusterId,
    second: ClusterId,
) {
    let mut assignments: Vec<Option<ClusterId>> = items.iter().map(|i| i.cluster_id).collect();
    merge_clusters(table, &mut assignments, first, second);
    for (item, assignment) in items.iter_mut().zip(assignments) {
        item.cluster_id = assignment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn setup(positions: &[(u64, f64, f64)]) -> (Vec<Item>, ClusterTable) {
        let mut table = ClusterTable::new();
        let mut seen = Vec::new();
        let mut items = Vec::new();
        for (index, &(cluster, x, y)) in positions.iter().enumerate() {
            while seen.len() <= cluster as usize {
                seen.push(table.allocate(None, 0));
            }
            let id = seen[cluster as usize];
            let label = format!("item-{index}");
            let mut item = Item::new(label.clone(), vec![0.0], String::new());
            item.cluster_id = Some(id);
            item.position = [x, y];
            items.push(item);
            if let Some(node) = table.get_mut(id) {
                node.member_labels.push(label);
            }
        }
        (items, table)
    }

    #[test]
    fn close_points_in_different_clusters_overlap() {
        let (items, _) = setup(&[(0, 0.0, 0.0), (1, 1.0, 0.0)]);
        let ids = cluster_order(&items);
        assert!(check_overlap(&items, ids[0], ids[1], 5.0));
        assert!(!check_overlap(&items, ids[0], ids[1], 0.5));
    }

    #[test]
    fn merge_policy_combines_overlapping_clusters() {
        let (mut items, mut table) = setup(&[(0, 0.0, 0.0), (1, 1.0, 0.0), (1, 2.0, 0.0)]);
        let config = LayoutConfig {
            overlap_policy: OverlapPolicy::Merge,
            ..LayoutConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        resolve_overlaps(&mut items, &mut table, &config, &mut rng);
        assert_eq!(table.len(), 1);
        let survivor = items[0].cluster_id;
        assert!(items.iter().all(|i| i.cluster_id == survivor));
        assert_eq!(table.member_count(survivor.unwrap()), 3);
    }

    #[test]
    fn nudge_policy_keeps_cluster_count() {
        let (mut items, mut table) = setup(&[(0, 0.0, 0.0), (1, 1.0, 0.0)]);
        let config = LayoutConfig {
            overlap_policy: OverlapPolicy::Nudge { max_retries: 50 },
            ..LayoutConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        resolve_overlaps(&mut items, &mut table, &config, &mut rng);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn disjoint_clusters_are_left_alone() {
        let (mut items, mut table) = setup(&[(0, 0.0, 0.0), (1, 100.0, 100.0)]);
        let before: Vec<[f64; 2]> = items.iter().map(|i| i.position).collect();
        let config = LayoutConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let unresolved = resolve_overlaps(&mut items, &mut table, &config, &mut rng);
        assert_eq!(unresolved, 0);
        let after: Vec<[f64; 2]> = items.iter().map(|i| i.position).collect();
        assert_eq!(before, after);
    }
}
