use std::collections::HashMap;

use anyhow::anyhow;

use crate::clustering::{ClusterStrategy, HierarchyParams, PartitionParams};
use crate::engine::{ClusterLayoutEngine, EngineConfig};
use crate::mst::MstSpace;
use crate::providers::{EmbeddingProvider, InputRecord, LeadingAxesProjector};

/// Embedding provider backed by a fixed text-to-vector table, so
/// tests control the geometry exactly.
struct TableProvider {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingProvider for TableProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no vector for \"{text}\""))
    }
}

/// Two tight groups of six items each in 4D, far apart.
fn two_group_records() -> (Vec<InputRecord>, TableProvider) {
    let mut vectors = HashMap::new();
    let mut records = Vec::new();
    for i in 0..12 {
        let label = format!("item-{i}");
        let text = format!("text-{i}");
        let offset = (i % 6) as f32 * 0.01;
        let embedding = if i < 6 {
            vec![5.0 + offset, 5.0, 5.0, 5.0]
        } else {
            vec![-5.0 + offset, 5.0, -5.0, 5.0]
        };
        vectors.insert(text.clone(), embedding);
        records.push(InputRecord {
            label,
            text_fields: vec![text],
            raw_popularity: format!("{}", (i + 1) * 100),
        });
    }
    (records, TableProvider { vectors })
}

fn hierarchical_config(max_depth: usize, min_nodes: usize) -> EngineConfig {
    EngineConfig {
        strategy: ClusterStrategy::Hierarchical(HierarchyParams {
            max_cluster_depth: max_depth,
            min_nodes_per_cluster: min_nodes,
        }),
        ..EngineConfig::default()
    }
}

#[test]
fn two_tight_groups_split_into_two_clusters_with_full_msts() {
    let (records, provider) = two_group_records();
    let mut engine = ClusterLayoutEngine::new(hierarchical_config(1, 3));
    engine.load_records(records, &provider).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    let table = engine.clusters();
    assert_eq!(table.len(), 2);
    for node in table.iter() {
        assert_eq!(node.member_labels.len(), 6);
    }

    // 5 spanning-tree edges per 6-member cluster, 10 total.
    assert_eq!(engine.mst_edges().len(), 10);
    for id in table.live_ids() {
        let count = engine.mst_edges().iter().filter(|e| e.cluster_id == id).count();
        assert_eq!(count, 5);
    }

    // Dense ordinal labels 1 and 2.
    let mut ordinals: Vec<usize> = engine.ordinal_labels().values().copied().collect();
    ordinals.sort_unstable();
    assert_eq!(ordinals, vec![1, 2]);
}

#[test]
fn fewer_items_than_min_cluster_size_collapse_to_one_cluster() {
    let mut vectors = HashMap::new();
    let records: Vec<InputRecord> = (0..8)
        .map(|i| {
            let text = format!("text-{i}");
            vectors.insert(text.clone(), vec![i as f32, 3.0, (i * i) as f32 * 0.1]);
            InputRecord {
                label: format!("item-{i}"),
                text_fields: vec![text],
                raw_popularity: format!("{}", i + 1),
            }
        })
        .collect();

    let mut engine = ClusterLayoutEngine::new(hierarchical_config(2, 10));
    engine.load_records(records, &TableProvider { vectors }).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    let table = engine.clusters();
    assert_eq!(table.len(), 1);
    let id = table.live_ids()[0];
    assert_eq!(table.member_count(id), 8);
    assert!(engine.items().iter().all(|item| item.cluster_id == Some(id)));
    assert_eq!(engine.mst_edges().len(), 7);
}

#[test]
fn zero_variance_popularity_leaves_importance_unset() {
    let mut vectors = HashMap::new();
    let records: Vec<InputRecord> = (0..3)
        .map(|i| {
            let text = format!("text-{i}");
            vectors.insert(text.clone(), vec![i as f32 * 4.0, 1.0]);
            InputRecord {
                label: format!("item-{i}"),
                text_fields: vec![text],
                raw_popularity: "1".to_string(),
            }
        })
        .collect();

    let mut engine = ClusterLayoutEngine::new(hierarchical_config(1, 1));
    engine.load_records(records, &TableProvider { vectors }).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();
    assert!(engine.items().iter().all(|item| item.importance.is_none()));
}

#[test]
fn every_assignment_resolves_to_a_live_cluster() {
    let (records, provider) = two_group_records();
    let mut engine = ClusterLayoutEngine::new(hierarchical_config(2, 3));
    engine.load_records(records, &provider).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    for item in engine.items() {
        let id = item.cluster_id.expect("item assigned");
        assert!(engine.clusters().contains(id), "dangling cluster id {id}");
    }
}

#[test]
fn surviving_clusters_respect_min_size_or_are_the_root_bucket() {
    let (records, provider) = two_group_records();
    let mut engine = ClusterLayoutEngine::new(hierarchical_config(3, 4));
    engine.load_records(records, &provider).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    for node in engine.clusters().iter() {
        if node.member_labels.len() < 4 {
            assert!(
                node.parent_id.is_none(),
                "undersized non-root cluster {} with {} members",
                node.id,
                node.member_labels.len()
            );
        }
    }
}

#[test]
fn importance_is_monotonic_in_raw_popularity() {
    let (records, provider) = two_group_records();
    let mut engine = ClusterLayoutEngine::new(hierarchical_config(1, 3));
    engine.load_records(records, &provider).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    // Raw popularity is (i + 1) * 100, strictly increasing by item.
    let importances: Vec<f64> = engine
        .items()
        .iter()
        .map(|item| item.importance.expect("importance set"))
        .collect();
    for pair in importances.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    let (low, high) = (5.0, 60.0);
    for value in &importances {
        assert!(*value >= low && *value <= high);
    }
}

#[test]
fn flat_partition_feeds_the_same_downstream_contract() {
    let (records, provider) = two_group_records();
    let config = EngineConfig {
        strategy: ClusterStrategy::FlatPartition(PartitionParams {
            min_clusters: 2,
            max_clusters: 2,
            min_nodes_per_cluster: 6,
            seed: 42,
        }),
        mst_space: MstSpace::Layout,
        ..EngineConfig::default()
    };
    let mut engine = ClusterLayoutEngine::new(config);
    engine.load_records(records, &provider).unwrap();
    engine.make_clusters(&LeadingAxesProjector, None).unwrap();

    assert_eq!(engine.clusters().len(), 2);
    assert_eq!(engine.mst_edges().len(), 10);
    for item in engine.items() {
        assert!(engine.clusters().contains(item.cluster_id.unwrap()));
    }
}
