use thiserror::Error;

/// Errors surfaced by the cluster layout engine.
///
/// Structural errors (`EmptyInput`, `SchemaMismatch`) abort the whole
/// run before anything is persisted. `EmbeddingProvider` failures are
/// recovered per item inside the engine and only reach the caller when
/// wrapped in a batch-level problem. `DegenerateInput` is recoverable:
/// the caller may leave the affected channel unset and continue.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usable text rows after filtering blank entries")]
    EmptyInput,

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("embedding provider failed for \"{preview}\": {source}")]
    EmbeddingProvider {
        preview: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Builds an `EmbeddingProvider` error carrying a truncated preview
    /// of the offending input text for log output.
    pub fn embedding_provider(text: &str, source: anyhow::Error) -> Self {
        let preview: String = text.chars().take(30).collect();
        EngineError::EmbeddingProvider { preview, source }
    }
}
