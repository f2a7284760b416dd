use anyhow::Result;

/// One row of tabular input, as produced by the input loader: a
/// display label, the text fields to embed (concatenated in order),
/// and the raw popularity string.
#[derive(Debug, Clone)]
pub struct InputRecord {
    pub label: String,
    pub text_fields: Vec<String>,
    pub raw_popularity: String,
}

impl InputRecord {
    /// Order-preserving concatenation of the text fields, the exact
    /// string handed to the embedding provider.
    pub fn combined_text(&self) -> String {
        self.text_fields.concat()
    }
}

/// Produces a fixed-dimensionality embedding per input text. Calls are
/// issued sequentially, one per text; a per-call failure drops that
/// item from the working set without aborting the batch.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces a short human-readable name for a cluster from the
/// concatenation of its member labels. Best-effort display annotation
/// only; never consulted for membership decisions.
pub trait ClusterNamer {
    fn name_cluster(&self, context: &str) -> Result<String>;
}

/// Projects a cluster's embeddings down to 2D. Invoked once per
/// cluster; output row order must match input row order.
pub trait Projector {
    fn project(&self, embeddings: &[Vec<f32>]) -> Result<Vec<[f64; 2]>>;
}

/// Embedding provider that parses the input text itself as a JSON
/// float array. Lets the CLI run against precomputed embeddings
/// instead of a remote model.
pub struct JsonVectorProvider;

impl EmbeddingProvider for JsonVectorProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector: Vec<f32> = serde_json::from_str(text)?;
        anyhow::ensure!(!vector.is_empty(), "empty embedding vector");
        Ok(vector)
    }
}

/// Trivial deterministic projector: keeps the first two embedding
/// axes. Good enough for the CLI and tests, where the real reducer is
/// injected by the caller.
pub struct LeadingAxesProjector;

impl Projector for LeadingAxesProjector {
    fn project(&self, embeddings: &[Vec<f32>]) -> Result<Vec<[f64; 2]>> {
        embeddings
            .iter()
            .map(|embedding| {
                anyhow::ensure!(
                    embedding.len() >= 2,
                    "need at least 2 embedding dimensions, got {}",
                    embedding.len()
                );
                Ok([f64::from(embedding[0]), f64::from(embedding[1])])
            })
            .collect()
    }
}
