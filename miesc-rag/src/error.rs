//! Error taxonomy for the RAG enrichment pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("vector store error: {0}")]
    Storage(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("RAG subsystem is running in degraded mode: {0}")]
    Degraded(String),

    #[error("unknown vulnerability document id: {0}")]
    UnknownDocument(String),
}
