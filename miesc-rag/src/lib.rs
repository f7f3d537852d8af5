//! Knowledge base, embedding/hybrid retrieval, and LLM-context enrichment.
//!
//! This crate is deliberately decoupled from any specific LLM backend: it
//! answers "what do we already know about this kind of weakness" and hands
//! back either a structured hit list or a rendered string ready to splice
//! into a prompt. The `miesc-llm` crate depends on this one, never the
//! reverse.
//!
//! ```no_run
//! # async fn run() -> Result<(), miesc_rag::error::RagError> {
//! use std::sync::Arc;
//! use miesc_rag::{corpus, embedder::HashingEmbedder, rag::HybridRag, vector_store::InMemoryVectorStore};
//!
//! let store = Arc::new(InMemoryVectorStore::new());
//! let embedder = Arc::new(HashingEmbedder::new());
//! let rag = HybridRag::new(store, embedder, corpus::builtin_corpus()).await?;
//! let context = rag.get_context_for_llm("reentrancy in withdraw", 3).await?;
//! println!("{}", context.rendered);
//! # Ok(())
//! # }
//! ```

pub mod bm25;
pub mod cache;
pub mod corpus;
pub mod embedder;
pub mod error;
pub mod hybrid;
pub mod rag;
pub mod types;
pub mod vector_store;

pub use error::RagError;
pub use rag::{EmbeddingRag, HybridRag};
pub use types::{LlmContext, ScoredDocument, VulnerabilityDocument};
