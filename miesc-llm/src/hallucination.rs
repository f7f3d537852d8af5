//! Hallucination defense: never let a model-fabricated taxonomy ID reach a
//! finding. Unknown SWC/CWE/OWASP IDs are stripped, not rewritten or
//! guessed at — the finding's `normalized_type` and description stand on
//! their own even with an empty taxonomy list.

use miesc_core::finding::{Finding, TaxonomyId};
use miesc_core::taxonomy;

/// Removes every taxonomy ID on `finding` that `miesc-core`'s static
/// tables don't recognize. Returns the count of IDs removed, for logging.
pub fn strip_unknown_taxonomy_ids(finding: &mut Finding) -> usize {
    let before = finding.taxonomy.len();
    finding.taxonomy.retain(taxonomy::is_known);
    before - finding.taxonomy.len()
}

/// Applies [`strip_unknown_taxonomy_ids`] to every finding in `findings` in
/// place, returning the total number of IDs stripped across all of them.
pub fn strip_unknown_taxonomy_ids_batch(findings: &mut [Finding]) -> usize {
    findings
        .iter_mut()
        .map(strip_unknown_taxonomy_ids)
        .sum()
}

/// Parses a whitespace- or comma-separated list of taxonomy references
/// (e.g. `"SWC-107, CWE-9999"`) out of free-form LLM output, keeping only
/// the ones recognized by `miesc-core`'s static tables.
#[must_use]
pub fn parse_known_taxonomy_ids(text: &str) -> Vec<TaxonomyId> {
    text.split([',', ' ', '\n'])
        .filter_map(|token| parse_taxonomy_token(token.trim()))
        .filter(taxonomy::is_known)
        .collect()
}

fn parse_taxonomy_token(token: &str) -> Option<TaxonomyId> {
    let (scheme, code) = token.split_once('-')?;
    let code = code.trim().to_string();
    if code.is_empty() {
        return None;
    }
    match scheme.to_ascii_uppercase().as_str() {
        "SWC" => Some(TaxonomyId::Swc(code)),
        "CWE" => Some(TaxonomyId::Cwe(code)),
        "OWASP" | "SC" => Some(TaxonomyId::Owasp(code)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miesc_core::finding::{Confidence, FindingStatus, Location, Severity};

    fn sample_finding(taxonomy: Vec<TaxonomyId>) -> Finding {
        Finding {
            id: uuid::Uuid::new_v4(),
            normalized_type: "reentrancy_naive".to_string(),
            title: "Reentrancy".to_string(),
            description: "...".to_string(),
            severity: Severity::High,
            confidence: Confidence::new(0.6),
            taxonomy,
            location: Location {
                file: "C.sol".to_string(),
                line: 10,
                column: None,
                function_name: None,
            },
            provenance: Vec::new(),
            status: FindingStatus::Raw,
            corroboration_count: 1,
        }
    }

    #[test]
    fn known_id_is_kept() {
        let mut finding = sample_finding(vec![TaxonomyId::Swc("107".to_string())]);
        let removed = strip_unknown_taxonomy_ids(&mut finding);
        assert_eq!(removed, 0);
        assert_eq!(finding.taxonomy.len(), 1);
    }

    #[test]
    fn fabricated_id_is_stripped_not_rewritten() {
        let mut finding = sample_finding(vec![
            TaxonomyId::Swc("107".to_string()),
            TaxonomyId::Swc("9999".to_string()),
        ]);
        let removed = strip_unknown_taxonomy_ids(&mut finding);
        assert_eq!(removed, 1);
        assert_eq!(finding.taxonomy, vec![TaxonomyId::Swc("107".to_string())]);
    }

    #[test]
    fn parses_only_known_ids_from_free_text() {
        let ids = parse_known_taxonomy_ids("SWC-107, CWE-9999 SWC-115");
        assert_eq!(
            ids,
            vec![
                TaxonomyId::Swc("107".to_string()),
                TaxonomyId::Swc("115".to_string()),
            ]
        );
    }

    #[test]
    fn batch_strip_reports_total_removed() {
        let mut findings = vec![
            sample_finding(vec![TaxonomyId::Swc("9999".to_string())]),
            sample_finding(vec![TaxonomyId::Swc("107".to_string())]),
        ];
        assert_eq!(strip_unknown_taxonomy_ids_batch(&mut findings), 1);
    }
}
