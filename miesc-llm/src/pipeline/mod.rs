//! The three LLM orchestration flows built on top of [`crate::backend::LlmBackend`]:
//! generator → verifier → consensus, ensemble voting, and the dual-role
//! auditor/critic flow. All three share the same cancellation and prompt
//! assembly plumbing, collected here as [`LlmPipeline`].

mod candidate;
mod consensus;
mod dual_role;
mod ensemble;

pub use candidate::CandidateFinding;
pub use consensus::ConsensusOutcome;
pub use dual_role::DualRoleOutcome;
pub use ensemble::EnsembleOutcome;

use std::sync::Arc;
use std::time::Duration;

use miesc_core::finding::Finding;
use miesc_core::orchestrator::CancellationToken;

use crate::backend::{GenerateOptions, LlmBackend};
use crate::config::EnsembleWeights;
use crate::error::PipelineError;
use crate::prompt::PromptAssembler;

/// Parameters shared by every pipeline run: sampling options, the
/// per-backend call timeout, and the minimum cumulative ensemble weight
/// required for a finding to be emitted.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub generate_options: GenerateOptions,
    pub verify_options: GenerateOptions,
    pub per_backend_timeout: Duration,
    pub consensus_weight_threshold: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            generate_options: GenerateOptions {
                temperature: 0.8,
                ..GenerateOptions::default()
            },
            verify_options: GenerateOptions {
                temperature: 0.1,
                ..GenerateOptions::default()
            },
            per_backend_timeout: Duration::from_secs(30),
            consensus_weight_threshold: 0.5,
        }
    }
}

/// Ties together the configured backends, their ensemble vote weights, and
/// the prompt assembler every pipeline stage calls through.
pub struct LlmPipeline {
    backends: Vec<Arc<dyn LlmBackend>>,
    weights: EnsembleWeights,
    assembler: PromptAssembler,
}

impl LlmPipeline {
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn LlmBackend>>, weights: EnsembleWeights, assembler: PromptAssembler) -> Self {
        Self {
            backends,
            weights,
            assembler,
        }
    }

    #[must_use]
    pub fn backends(&self) -> &[Arc<dyn LlmBackend>] {
        &self.backends
    }

    #[must_use]
    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    #[must_use]
    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn require_backends(&self) -> Result<(), PipelineError> {
        if self.backends.is_empty() {
            Err(PipelineError::NoBackends)
        } else {
            Ok(())
        }
    }

    async fn call_backend(
        &self,
        backend: &Arc<dyn LlmBackend>,
        prompt: &str,
        options: &GenerateOptions,
        timeout: Duration,
    ) -> Result<String, PipelineError> {
        tokio::time::timeout(timeout, backend.generate(prompt, options, timeout))
            .await
            .map_err(|_| PipelineError::Backend {
                backend: backend.name().to_string(),
                source: crate::error::LlmError::Timeout(timeout),
            })?
            .map_err(|source| PipelineError::Backend {
                backend: backend.name().to_string(),
                source,
            })
    }
}

/// Generator/auditor-style framing appended as the role prompt.
pub(crate) const ROLE_GENERATOR: &str = "ROLE: generator\nProduce candidate findings as JSON: {\"findings\": [{\"normalized_type\": str, \"title\": str, \"severity\": str, \"swc\": str, \"confidence\": float}]}.";
pub(crate) const ROLE_VERIFIER: &str = "ROLE: verifier\nReturn a single JSON object: {\"confirmed\": bool, \"confidence\": float, \"rationale\": str}.";
pub(crate) const ROLE_AUDITOR: &str = "ROLE: auditor\nProduce the broadest reasonable list of candidate findings as JSON: {\"findings\": [...]} (see generator schema).";
pub(crate) const ROLE_CRITIC: &str = "ROLE: critic\nReturn a single JSON object: {\"approved\": bool, \"comments\": str} judging whether the auditor's finding is real.";

/// Converts a surviving [`CandidateFinding`] into a domain [`Finding`],
/// stripping any taxonomy ID `miesc-core` doesn't recognize.
pub(crate) fn candidate_into_finding(
    candidate: CandidateFinding,
    adapter_name: &str,
    layer: u8,
    file: &str,
) -> Finding {
    use miesc_core::finding::{Confidence, FindingStatus, Location, Provenance};

    let mut taxonomy = candidate.taxonomy;
    taxonomy.retain(miesc_core::taxonomy::is_known);

    Finding {
        id: uuid::Uuid::new_v4(),
        normalized_type: candidate.normalized_type,
        title: candidate.title,
        description: candidate.rationale.unwrap_or_default(),
        severity: candidate.severity,
        confidence: Confidence::new(candidate.confidence),
        taxonomy,
        location: Location {
            file: file.to_string(),
            line: candidate.line.unwrap_or(0),
            column: None,
            function_name: candidate.function_name,
        },
        provenance: vec![Provenance {
            adapter: adapter_name.to_string(),
            layer,
            tool_version: None,
            raw_rule_id: None,
        }],
        status: FindingStatus::Raw,
        corroboration_count: 1,
    }
}
