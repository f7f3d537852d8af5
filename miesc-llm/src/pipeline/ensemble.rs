//! Ensemble voting: every configured backend runs the same generator
//! prompt independently; candidates that name the same `normalized_type`
//! accumulate the proposing backends' weights, and a finding is emitted
//! once its cumulative weight clears the configured threshold (default
//! 0.5, per [`PipelineOptions::consensus_weight_threshold`]). The merged
//! confidence is that cumulative weight.

use std::collections::HashMap;

use miesc_core::finding::Finding;
use miesc_core::orchestrator::CancellationToken;

use super::candidate::parse_candidates;
use super::{candidate_into_finding, CandidateFinding, LlmPipeline, PipelineOptions, ROLE_GENERATOR};
use crate::error::PipelineError;

/// Findings that cleared the ensemble's cumulative weight threshold.
#[derive(Debug, Clone)]
pub struct EnsembleOutcome {
    pub findings: Vec<Finding>,
}

impl LlmPipeline {
    pub async fn ensemble_vote(
        &self,
        contract_source: &str,
        file: &str,
        layer: u8,
        system_prompt: &str,
        task: &str,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<EnsembleOutcome, PipelineError> {
        self.require_backends()?;
        Self::check_cancelled(cancel)?;

        let mut votes: HashMap<String, (f32, CandidateFinding)> = HashMap::new();

        for backend in &self.backends {
            Self::check_cancelled(cancel)?;
            let weight = self.weights.weight_of(backend.name()).unwrap_or(0.0);
            if weight <= 0.0 {
                continue;
            }

            let prompt = self
                .assembler
                .assemble(system_prompt, ROLE_GENERATOR, contract_source, "", task);
            let raw = self
                .call_backend(backend, &prompt, &options.generate_options, options.per_backend_timeout)
                .await?;
            let candidates = parse_candidates(&raw, backend.name());

            for candidate in candidates {
                votes
                    .entry(candidate.normalized_type.clone())
                    .and_modify(|(accumulated, _)| *accumulated += weight)
                    .or_insert_with(|| (weight, candidate));
            }
        }

        Self::check_cancelled(cancel)?;

        let findings = votes
            .into_iter()
            .filter(|(_, (weight, _))| *weight >= options.consensus_weight_threshold)
            .map(|(_, (weight, mut candidate))| {
                candidate.confidence = f64::from(weight);
                candidate_into_finding(candidate, "ensemble", layer, file)
            })
            .collect();

        Ok(EnsembleOutcome { findings })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::LocalBackend;
    use crate::config::EnsembleWeights;
    use crate::prompt::PromptAssembler;

    fn pipeline(backend_names: &[&str]) -> LlmPipeline {
        let backends: Vec<Arc<dyn crate::backend::LlmBackend>> = backend_names
            .iter()
            .map(|name| Arc::new(LocalBackend::named(*name)) as Arc<dyn crate::backend::LlmBackend>)
            .collect();
        LlmPipeline::new(backends, EnsembleWeights::equal_split(backend_names), PromptAssembler::default())
    }

    #[tokio::test]
    async fn agreeing_backends_reach_full_confidence() {
        let pipeline = pipeline(&["a", "b"]);
        let source = "contract C { function f() public { msg.sender.call{value: 1}(\"\"); } }";
        let outcome = pipeline
            .ensemble_vote(source, "C.sol", 5, "sys", "task", &PipelineOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert!((outcome.findings[0].confidence.score() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn ensemble_vote_flags_tx_origin_signature() {
        let pipeline = pipeline(&["a", "b"]);
        let mut options = PipelineOptions::default();
        options.consensus_weight_threshold = 0.5;
        let source = "contract C { function f() public { tx.origin; } }";
        let outcome = pipeline
            .ensemble_vote(source, "C.sol", 5, "sys", "task", &options, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.findings.iter().any(|f| f.normalized_type == "tx_origin_authorization"));
    }

    #[tokio::test]
    async fn no_backends_configured_is_an_error() {
        let pipeline = LlmPipeline::new(Vec::new(), EnsembleWeights::default(), PromptAssembler::default());
        let result = pipeline
            .ensemble_vote("contract C {}", "C.sol", 5, "sys", "task", &PipelineOptions::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::NoBackends)));
    }
}
