use tracing::debug;

use crate::clustering::types::{ClusterId, ClusterTable};
use crate::TARGET_CLUSTERING;

/// Merges one cluster into another
///
/// Reassigns every item tracked under `child_id` to `parent_id`,
/// concatenates the child's member list into the parent's, and retires
/// `child_id` from the live-node table. The retired id is never
/// reused.
///
/// Idempotent: merging an already-retired `child_id` is a no-op, as is
/// merging a cluster into itself.
///
/// # Arguments
/// * `table` - Live cluster table
/// * `assignments` - Per-item cluster assignments, updated in place
/// * `parent_id` - Cluster that absorbs the membership
/// * `child_id` - Cluster being merged away
pub fn merge_clusters(
    table: &mut ClusterTable,
    assignments: &mut [Option<ClusterId>],
    parent_id: ClusterId,
    child_id: ClusterId,
) {
    if parent_id == child_id {
        return;
    }

    // Already retired by an earlier merge: nothing to do.
    let Some(child) = table.retire(child_id) else {
        return;
    };

    debug!(
        target: TARGET_CLUSTERING,
        "Merging cluster {} ({} members) into cluster {}",
        child_id,
        child.member_labels.len(),
        parent_id
    );

    for assignment in assignments.iter_mut() {
        if *assignment == Some(child_id) {
            *assignment = Some(parent_id);
        }
    }

    if let Some(parent) = table.get_mut(parent_id) {
        parent.member_labels.extend(child.member_labels);
        parent.children.retain(|&c| c != child_id);
    }
}
