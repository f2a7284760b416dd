use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::clustering::{
    label_clusters, ClusterId, ClusterStrategy, ClusterTable, HierarchyParams, Item,
};
use crate::error::{EngineError, Result};
use crate::importance;
use crate::layout::{space_out_clusters, LayoutConfig};
use crate::mst::{extract_mst_edges, MstEdge, MstSpace};
use crate::providers::{ClusterNamer, EmbeddingProvider, InputRecord, Projector};
use crate::{TARGET_CLUSTERING, TARGET_PROVIDER};

/// Engine configuration: clustering strategy, layout tuning, the
/// importance target range, and which space MSTs are computed in.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub strategy: ClusterStrategy,
    pub layout: LayoutConfig,
    pub importance_range: (f64, f64),
    pub mst_space: MstSpace,
    /// Seed for the jitter and overlap-nudge randomness.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategy::Hierarchical(HierarchyParams {
                max_cluster_depth: 2,
                min_nodes_per_cluster: 10,
            }),
            layout: LayoutConfig::default(),
            importance_range: (5.0, 60.0),
            mst_space: MstSpace::Embedding,
            seed: 42,
        }
    }
}

/// Owns one dataset's item table, cluster table, and configuration.
/// Single-threaded and synchronous: one batch per invocation, no
/// shared state across instances.
pub struct ClusterLayoutEngine {
    config: EngineConfig,
    items: Vec<Item>,
    clusters: ClusterTable,
    ordinal_labels: HashMap<ClusterId, usize>,
    mst_edges: Vec<MstEdge>,
}

impl ClusterLayoutEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            clusters: ClusterTable::new(),
            ordinal_labels: HashMap::new(),
            mst_edges: Vec::new(),
        }
    }

    /// Loads input records into the working set, embedding each
    /// record's concatenated text fields through the provider.
    ///
    /// Blank-text rows are filtered up front; an empty remainder is an
    /// `EmptyInput` error. Per-record provider failures are logged
    /// with a truncated preview and that record is dropped, the batch
    /// continues. A dimensionality disagreement across returned
    /// embeddings is a `SchemaMismatch`.
    pub fn load_records(
        &mut self,
        records: Vec<InputRecord>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<()> {
        let usable: Vec<InputRecord> = records
            .into_iter()
            .filter(|record| !record.combined_text().trim().is_empty())
            .collect();
        if usable.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let mut items = Vec::with_capacity(usable.len());
        for record in usable {
            let text = record.combined_text();
            match provider.embed(&text) {
                Ok(embedding) => {
                    items.push(Item::new(record.label, embedding, record.raw_popularity));
                }
                Err(source) => {
                    let err = EngineError::embedding_provider(&text, source);
                    warn!(target: TARGET_PROVIDER, "Dropping record \"{}\": {}", record.label, err);
                }
            }
        }
        if items.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let dims = items[0].embedding.len();
        for item in &items {
            if item.embedding.len() != dims {
                return Err(EngineError::SchemaMismatch(format!(
                    "embedding dimensionality disagrees: {} vs {} (item \"{}\")",
                    dims,
                    item.embedding.len(),
                    item.label
                )));
            }
        }

        info!(
            target: TARGET_CLUSTERING,
            "Loaded {} items with {}-dimensional embeddings",
            items.len(),
            dims
        );
        self.items = items;
        Ok(())
    }

    /// Runs the full pipeline over the loaded items: importance
    /// normalization, cluster assignment, per-cluster 2D projection,
    /// optional cluster naming, layout synthesis, ordinal labeling,
    /// and MST extraction.
    pub fn make_clusters(
        &mut self,
        projector: &dyn Projector,
        namer: Option<&dyn ClusterNamer>,
    ) -> Result<()> {
        if self.items.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        self.normalize_importance();

        let (mut table, assignments) = self.config.strategy.assign(&self.items);
        for (item, id) in self.items.iter_mut().zip(assignments.iter()) {
            item.cluster_id = Some(*id);
        }

        self.project_clusters(&table, projector)?;

        if let Some(namer) = namer {
            self.name_clusters(&mut table, namer);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        space_out_clusters(&mut self.items, &mut table, &self.config.layout, &mut rng);

        let live_assignments: Vec<ClusterId> = self
            .items
            .iter()
            .filter_map(|item| item.cluster_id)
            .collect();
        self.ordinal_labels = label_clusters(&live_assignments);
        self.mst_edges = extract_mst_edges(&self.items, &table, self.config.mst_space);
        self.clusters = table;
        Ok(())
    }

    /// Min-max rescales the raw popularity signal into the configured
    /// z-range. Zero-variance input leaves the channel unset.
    fn normalize_importance(&mut self) {
        let raw: Vec<&str> = self
            .items
            .iter()
            .map(|item| item.raw_popularity.as_str())
            .collect();
        match importance::normalize(&raw, self.config.importance_range) {
            Ok(values) => {
                for (item, value) in self.items.iter_mut().zip(values) {
                    item.importance = value;
                }
            }
            Err(err) => {
                warn!(
                    target: TARGET_CLUSTERING,
                    "Skipping importance channel: {}", err
                );
            }
        }
    }

    /// Invokes the injected projector once per cluster and merges the
    /// 2D coordinates back into the item table, input order preserved.
    fn project_clusters(&mut self, table: &ClusterTable, projector: &dyn Projector) -> Result<()> {
        for id in table.live_ids() {
            let member_indices: Vec<usize> = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.cluster_id == Some(id))
                .map(|(index, _)| index)
                .collect();
            if member_indices.is_empty() {
                continue;
            }
            let embeddings: Vec<Vec<f32>> = member_indices
                .iter()
                .map(|&index| self.items[index].embedding.clone())
                .collect();

            let coords = projector.project(&embeddings).map_err(|err| {
                EngineError::SchemaMismatch(format!("2D projection failed for cluster {id}: {err}"))
            })?;
            if coords.len() != member_indices.len() {
                return Err(EngineError::SchemaMismatch(format!(
                    "projector returned {} rows for {} members of cluster {id}",
                    coords.len(),
                    member_indices.len()
                )));
            }

            for (&index, position) in member_indices.iter().zip(coords) {
                self.items[index].position = position;
            }
        }
        Ok(())
    }

    /// Best-effort display names from the naming provider; failures
    /// are logged and the cluster keeps no name.
    fn name_clusters(&self, table: &mut ClusterTable, namer: &dyn ClusterNamer) {
        for id in table.live_ids() {
            let context = match table.get(id) {
                Some(node) => node.member_labels.join(" "),
                None => continue,
            };
            match namer.name_cluster(&context) {
                Ok(name) => {
                    if let Some(node) = table.get_mut(id) {
                        node.name = Some(name);
                    }
                }
                Err(err) => {
                    warn!(
                        target: TARGET_PROVIDER,
                        "Cluster naming failed for cluster {}: {}", id, err
                    );
                }
            }
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn clusters(&self) -> &ClusterTable {
        &self.clusters
    }

    pub fn mst_edges(&self) -> &[MstEdge] {
        &self.mst_edges
    }

    pub fn ordinal_labels(&self) -> &HashMap<ClusterId, usize> {
        &self.ordinal_labels
    }
}
