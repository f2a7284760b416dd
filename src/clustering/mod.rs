// Module declarations
pub mod hierarchy;
pub mod labeling;
pub mod merging;
pub mod partition;
#[cfg(test)]
mod tests;
pub mod types;

// Re-export all types from types module
pub use types::*;

// Re-export key functions from modules
pub use hierarchy::{ward_linkage, HierarchyParams, LinkageTree};
pub use labeling::label_clusters;
pub use merging::merge_clusters;
pub use partition::{cluster_count, PartitionParams};

/// Clustering strategy selected by configuration. Both variants share
/// the same output contract (a cluster table plus per-item
/// assignments), so downstream layout and MST stages are
/// strategy-agnostic.
#[derive(Debug, Clone, Copy)]
pub enum ClusterStrategy {
    /// Depth-bounded agglomerative tree with small-cluster merge-up.
    Hierarchical(HierarchyParams),
    /// Direct k-means partition, no tree.
    FlatPartition(PartitionParams),
}

impl ClusterStrategy {
    /// Runs the selected strategy over the items.
    pub fn assign(&self, items: &[Item]) -> (ClusterTable, Vec<ClusterId>) {
        match self {
            ClusterStrategy::Hierarchical(params) => hierarchy::assign_clusters(items, *params),
            ClusterStrategy::FlatPartition(params) => partition::assign_clusters(items, *params),
        }
    }
}
