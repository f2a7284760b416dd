use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier for a cluster. Ids are allocated from a
/// monotonically increasing counter owned by the cluster table and are
/// never reused after a merge retires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Struct representing one item of the working set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub label: String,
    pub embedding: Vec<f32>,
    pub raw_popularity: String,
    pub cluster_id: Option<ClusterId>,
    pub position: [f64; 2],
    pub importance: Option<f64>,
}

impl Item {
    pub fn new(label: String, embedding: Vec<f32>, raw_popularity: String) -> Self {
        Self {
            label,
            embedding,
            raw_popularity,
            cluster_id: None,
            position: [0.0, 0.0],
            importance: None,
        }
    }
}

/// Struct representing a cluster record in the live-node table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: ClusterId,
    pub parent_id: Option<ClusterId>,
    pub depth: usize,
    pub children: Vec<ClusterId>,
    pub member_labels: Vec<String>,
    pub name: Option<String>,
}

/// Table of live cluster records, keyed by ClusterId.
///
/// All membership mutation goes through [`merge_clusters`] so the node
/// table and the item assignments stay consistent with each other.
///
/// [`merge_clusters`]: crate::clustering::merging::merge_clusters
#[derive(Debug, Default)]
pub struct ClusterTable {
    nodes: BTreeMap<ClusterId, ClusterNode>,
    next_id: u64,
}

impl ClusterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh cluster id and inserts an empty node for it.
    pub fn allocate(&mut self, parent_id: Option<ClusterId>, depth: usize) -> ClusterId {
        let id = ClusterId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            ClusterNode {
                id,
                parent_id,
                depth,
                children: Vec::new(),
                member_labels: Vec::new(),
                name: None,
            },
        );
        id
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: ClusterId) -> Option<&ClusterNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ClusterId) -> Option<&mut ClusterNode> {
        self.nodes.get_mut(&id)
    }

    pub fn member_count(&self, id: ClusterId) -> usize {
        self.nodes
            .get(&id)
            .map(|node| node.member_labels.len())
            .unwrap_or(0)
    }

    /// Removes a node from the live table, returning it if present.
    pub(crate) fn retire(&mut self, id: ClusterId) -> Option<ClusterNode> {
        self.nodes.remove(&id)
    }

    /// Live cluster ids in ascending id order.
    pub fn live_ids(&self) -> Vec<ClusterId> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.values()
    }
}
