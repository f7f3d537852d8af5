//! Generator → Verifier → Consensus: a generator backend proposes
//! candidates at high temperature; each candidate is checked by a verifier
//! backend at low temperature against retrieved context, and survives if
//! either the verifier confirms it or it independently agrees with a
//! statically-produced finding for the same contract.

use std::collections::HashMap;

use miesc_core::finding::Finding;
use miesc_core::orchestrator::CancellationToken;

use super::candidate::parse_candidates;
use super::{candidate_into_finding, LlmPipeline, PipelineOptions, ROLE_GENERATOR, ROLE_VERIFIER};
use crate::error::PipelineError;

/// Result of a generator → verifier → consensus pass: the findings that
/// survived, and how many generator candidates were discarded.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub findings: Vec<Finding>,
    pub discarded: usize,
}

struct VerifierVerdict {
    confirmed: bool,
    adjusted_confidence: Option<f64>,
}

fn parse_verdict(raw: &str) -> VerifierVerdict {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return VerifierVerdict {
            confirmed: false,
            adjusted_confidence: None,
        };
    };
    VerifierVerdict {
        confirmed: value
            .get("confirmed")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
        adjusted_confidence: value
            .get("confidence")
            .or_else(|| value.get("adjusted_confidence"))
            .and_then(serde_json::Value::as_f64),
    }
}

impl LlmPipeline {
    /// Runs the generator → verifier → consensus flow once over
    /// `contract_source`.
    ///
    /// `rag_context_by_type` holds a pre-rendered RAG context block per
    /// `normalized_type`, produced upstream by a single batch RAG lookup
    /// (see `miesc-rag`'s `batch_get_context_for_findings`) so this
    /// pipeline never has to know which RAG backend is in use.
    /// `static_findings` are the preliminary, non-LLM findings for the
    /// same contract, used for the independent-agreement consensus rule.
    pub async fn generate_verify_consensus(
        &self,
        contract_source: &str,
        file: &str,
        layer: u8,
        system_prompt: &str,
        task: &str,
        static_findings: &[Finding],
        rag_context_by_type: &HashMap<String, String>,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<ConsensusOutcome, PipelineError> {
        self.require_backends()?;
        Self::check_cancelled(cancel)?;

        let generator = &self.backends[0];
        let generator_prompt =
            self.assembler
                .assemble(system_prompt, ROLE_GENERATOR, contract_source, "", task);
        let raw = self
            .call_backend(
                generator,
                &generator_prompt,
                &options.generate_options,
                options.per_backend_timeout,
            )
            .await?;
        Self::check_cancelled(cancel)?;
        let candidates = parse_candidates(&raw, generator.name());

        let verifier = self.backends.get(1).unwrap_or(generator);
        let mut findings = Vec::new();
        let mut discarded = 0usize;

        for candidate in candidates {
            Self::check_cancelled(cancel)?;

            let context = rag_context_by_type
                .get(&candidate.normalized_type)
                .cloned()
                .unwrap_or_default();
            let verify_task = format!(
                "Verify this candidate finding: {} ({})",
                candidate.title, candidate.normalized_type
            );
            let verify_prompt = self.assembler.assemble(
                system_prompt,
                ROLE_VERIFIER,
                contract_source,
                &context,
                &verify_task,
            );
            let raw_verdict = self
                .call_backend(
                    verifier,
                    &verify_prompt,
                    &options.verify_options,
                    options.per_backend_timeout,
                )
                .await?;
            let verdict = parse_verdict(&raw_verdict);

            let agrees_with_static = static_findings
                .iter()
                .any(|f| f.normalized_type == candidate.normalized_type);

            if verdict.confirmed || agrees_with_static {
                let mut candidate = candidate;
                if let Some(adjusted) = verdict.adjusted_confidence {
                    candidate.confidence = adjusted;
                }
                findings.push(candidate_into_finding(candidate, verifier.name(), layer, file));
            } else {
                discarded += 1;
            }
        }

        Self::check_cancelled(cancel)?;
        Ok(ConsensusOutcome { findings, discarded })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::backend::LocalBackend;
    use crate::config::EnsembleWeights;
    use crate::prompt::PromptAssembler;

    fn pipeline() -> LlmPipeline {
        let backends: Vec<Arc<dyn crate::backend::LlmBackend>> = vec![Arc::new(LocalBackend::new())];
        LlmPipeline::new(backends, EnsembleWeights::equal_split(&["local"]), PromptAssembler::default())
    }

    #[tokio::test]
    async fn reentrancy_signature_survives_consensus() {
        let pipeline = pipeline();
        let source = "contract C { function f() public { msg.sender.call{value: 1}(\"\"); } }";
        let outcome = pipeline
            .generate_verify_consensus(
                source,
                "C.sol",
                4,
                "You are an auditor.",
                "List findings.",
                &[],
                &HashMap::new(),
                &PipelineOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].normalized_type, "reentrancy_naive");
    }

    #[tokio::test]
    async fn clean_source_yields_no_findings() {
        let pipeline = pipeline();
        let source = "contract C { function f() public returns (uint) { return 1; } }";
        let outcome = pipeline
            .generate_verify_consensus(
                source,
                "C.sol",
                4,
                "sys",
                "task",
                &[],
                &HashMap::new(),
                &PipelineOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.discarded, 0);
    }

    #[tokio::test]
    async fn cancelled_run_returns_cancelled_error() {
        let pipeline = pipeline();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pipeline
            .generate_verify_consensus(
                "contract C {}",
                "C.sol",
                4,
                "sys",
                "task",
                &[],
                &HashMap::new(),
                &PipelineOptions::default(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
