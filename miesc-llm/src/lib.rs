//! # miesc-llm: LLM adapter facilities for MIESC
//!
//! Reusable scaffolding shared by every LLM-backed adapter layer: prompt
//! assembly, the generator→verifier→consensus pipeline, ensemble voting
//! across multiple backends, the dual-role auditor/critic flow, and
//! hallucination defense that never lets a model fabricate a taxonomy ID.
//!
//! - [`backend`] — the narrow [`backend::LlmBackend`] trait every model
//!   integration implements, plus a network-free [`backend::LocalBackend`]
//!   and a generic [`backend::HttpBackend`] for remote chat-completion APIs.
//! - [`config`] — [`config::LlmConfig`] and its validating builder, including
//!   the ensemble voting weight table.
//! - [`prompt`] — line-aware prompt assembly and source truncation.
//! - [`pipeline`] — the generator/verifier/consensus, ensemble voting, and
//!   dual-role auditor/critic orchestrations.
//! - [`hallucination`] — taxonomy ID validation against `miesc-core`'s
//!   static registry tables.
//! - [`error`] — the crate's error taxonomy.
//!
//! `miesc-llm` depends on `miesc-core` for [`Finding`](miesc_core::finding::Finding)
//! and on `miesc-rag` for batched context retrieval; neither of those crates
//! depends back on this one.

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod hallucination;
pub mod pipeline;
pub mod prompt;

/// Re-exports for the common entry points most callers need.
pub mod prelude {
    pub use crate::backend::{GenerateOptions, LlmBackend, LocalBackend};
    pub use crate::config::{EnsembleWeights, LlmConfig, LlmConfigBuilder};
    pub use crate::error::LlmError;
    pub use crate::pipeline::{LlmPipeline, PipelineOptions};
    pub use crate::prompt::PromptAssembler;
}
