use std::collections::HashMap;

use crate::clustering::types::ClusterId;

/// Assigns each live cluster a dense ordinal label starting at 1, in
/// the order the ids first appear in the item table's current
/// iteration order. Purely cosmetic; membership is untouched.
pub fn label_clusters(assignments: &[ClusterId]) -> HashMap<ClusterId, usize> {
    let mut labels = HashMap::new();
    let mut next = 1;
    for &id in assignments {
        labels.entry(id).or_insert_with(|| {
            let ordinal = next;
            next += 1;
            ordinal
        });
    }
    labels
}
