use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize session store: {0}")]
    History(#[source] anyhow::Error),

    #[error("Failed to open course catalog: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("Failed to open vector index: {0}")]
    VectorIndex(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),
}
