//! Core RAG types: the knowledge base document shape and a search result
//! envelope shared by the embedding, BM25, and hybrid retrievers.

use serde::{Deserialize, Serialize};

/// One entry in the vulnerability knowledge base: a self-contained
/// description of a weakness class, independent of any specific finding,
/// used both for similarity search and as the source of LLM context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityDocument {
    pub id: String,
    pub title: String,
    pub taxonomy_ids: Vec<String>,
    pub summary: String,
    pub detail: String,
    pub remediation: String,
    pub tags: Vec<String>,
}

impl VulnerabilityDocument {
    /// The text actually embedded and indexed: title, summary, detail, and
    /// tags concatenated, since splitting embedding across separate fields
    /// would require a multi-vector store this system doesn't have.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}\ntags: {}",
            self.title,
            self.summary,
            self.detail,
            self.tags.join(", ")
        )
    }
}

/// One scored hit from any retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: VulnerabilityDocument,
    pub score: f32,
}

/// A fully assembled piece of context ready to be spliced into an LLM
/// prompt: the top-k scored documents rendered as a single string plus the
/// structured hits they came from, so a caller can choose to use either.
#[derive(Debug, Clone)]
pub struct LlmContext {
    pub rendered: String,
    pub hits: Vec<ScoredDocument>,
}
