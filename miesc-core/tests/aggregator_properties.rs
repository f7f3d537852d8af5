//! Property-based tests for confidence fusion and aggregation invariants.

use miesc_core::aggregator::aggregate;
use miesc_core::finding::{Confidence, Finding, FindingStatus, Location, Provenance, Severity, TaxonomyId};
use proptest::prelude::*;

fn finding_with(adapter: &str, severity: Severity, confidence: f64, line: u32) -> Finding {
    Finding {
        id: uuid::Uuid::new_v4(),
        normalized_type: "reentrancy".to_string(),
        title: "Reentrancy".to_string(),
        description: "d".to_string(),
        severity,
        confidence: Confidence::new(confidence),
        taxonomy: vec![TaxonomyId::Swc("107".to_string())],
        location: Location {
            file: "Vault.sol".to_string(),
            line,
            column: None,
            function_name: Some("withdraw".to_string()),
        },
        provenance: vec![Provenance {
            adapter: adapter.to_string(),
            layer: 1,
            tool_version: None,
            raw_rule_id: None,
        }],
        status: FindingStatus::Raw,
        corroboration_count: 1,
    }
}

proptest! {
    #[test]
    fn noisy_or_fusion_is_bounded_and_monotonic(
        scores in prop::collection::vec(0.0f64..=1.0, 1..6),
    ) {
        let confidences: Vec<Confidence> = scores.iter().copied().map(Confidence::new).collect();
        let fused = Confidence::fuse(&confidences);
        prop_assert!(fused.score() >= 0.0 && fused.score() <= 1.0);

        let max_individual = scores.iter().cloned().fold(0.0_f64, f64::max);
        prop_assert!(fused.score() + 1e-9 >= max_individual);
    }

    #[test]
    fn noisy_or_fusion_is_order_independent(
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        c in 0.0f64..=1.0,
    ) {
        let forward = Confidence::fuse(&[Confidence::new(a), Confidence::new(b), Confidence::new(c)]);
        let shuffled = Confidence::fuse(&[Confidence::new(c), Confidence::new(a), Confidence::new(b)]);
        prop_assert!((forward.score() - shuffled.score()).abs() < 1e-9);
    }

    #[test]
    fn aggregate_never_increases_finding_count(
        n in 1usize..8,
        severity_idx in 0usize..5,
    ) {
        let severities = [
            Severity::Info,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ];
        let severity = severities[severity_idx % severities.len()];
        let findings: Vec<Finding> = (0..n)
            .map(|i| finding_with(&format!("adapter-{i}"), severity, 0.5, 40))
            .collect();
        let report = aggregate(findings);
        prop_assert!(report.findings.len() <= n);
        prop_assert_eq!(report.findings.len(), 1);
    }
}
