//! Dual-role auditor/critic: one backend (the auditor) proposes a superset
//! of candidate findings; a second backend (the critic), shown the
//! auditor's list and the contract, returns a keep/discard verdict with
//! reasoning for each one. Only findings the critic approves survive.

use miesc_core::finding::Finding;
use miesc_core::orchestrator::CancellationToken;

use super::candidate::parse_candidates;
use super::{candidate_into_finding, LlmPipeline, PipelineOptions, ROLE_AUDITOR, ROLE_CRITIC};
use crate::error::PipelineError;

/// Result of an auditor/critic pass: the findings the critic approved, and
/// how many the auditor proposed but the critic rejected.
#[derive(Debug, Clone)]
pub struct DualRoleOutcome {
    pub findings: Vec<Finding>,
    pub discarded: usize,
}

impl LlmPipeline {
    pub async fn dual_role_audit(
        &self,
        contract_source: &str,
        file: &str,
        layer: u8,
        system_prompt: &str,
        task: &str,
        options: &PipelineOptions,
        cancel: &CancellationToken,
    ) -> Result<DualRoleOutcome, PipelineError> {
        self.require_backends()?;
        Self::check_cancelled(cancel)?;

        let auditor = &self.backends[0];
        let critic = self.backends.get(1).unwrap_or(auditor);

        let auditor_prompt = self
            .assembler
            .assemble(system_prompt, ROLE_AUDITOR, contract_source, "", task);
        let raw = self
            .call_backend(auditor, &auditor_prompt, &options.generate_options, options.per_backend_timeout)
            .await?;
        Self::check_cancelled(cancel)?;
        let candidates = parse_candidates(&raw, auditor.name());

        let mut findings = Vec::new();
        let mut discarded = 0usize;

        for candidate in candidates {
            Self::check_cancelled(cancel)?;

            let critic_task = format!(
                "The auditor flagged: {} ({}). Approve or reject this finding.",
                candidate.title, candidate.normalized_type
            );
            let critic_prompt =
                self.assembler
                    .assemble(system_prompt, ROLE_CRITIC, contract_source, "", &critic_task);
            let raw_verdict = self
                .call_backend(critic, &critic_prompt, &options.verify_options, options.per_backend_timeout)
                .await?;
            let approved = parse_approved(&raw_verdict);

            if approved {
                findings.push(candidate_into_finding(candidate, critic.name(), layer, file));
            } else {
                discarded += 1;
            }
        }

        Self::check_cancelled(cancel)?;
        Ok(DualRoleOutcome { findings, discarded })
    }
}

fn parse_approved(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.get("approved").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::LocalBackend;
    use crate::config::EnsembleWeights;
    use crate::prompt::PromptAssembler;

    fn pipeline() -> LlmPipeline {
        let backends: Vec<Arc<dyn crate::backend::LlmBackend>> = vec![Arc::new(LocalBackend::new())];
        LlmPipeline::new(backends, EnsembleWeights::equal_split(&["local"]), PromptAssembler::default())
    }

    #[tokio::test]
    async fn critic_approves_corroborated_finding() {
        let pipeline = pipeline();
        let source = "contract C { function f() public { selfdestruct(payable(msg.sender)); } }";
        let outcome = pipeline
            .dual_role_audit(source, "C.sol", 6, "sys", "task", &PipelineOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].normalized_type, "unprotected_selfdestruct");
        assert_eq!(outcome.discarded, 0);
    }

    #[tokio::test]
    async fn clean_source_has_nothing_to_approve() {
        let pipeline = pipeline();
        let source = "contract C { function f() public pure returns (uint) { return 1; } }";
        let outcome = pipeline
            .dual_role_audit(source, "C.sol", 6, "sys", "task", &PipelineOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.findings.is_empty());
    }
}
