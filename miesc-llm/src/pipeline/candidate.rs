//! The provisional finding shape a generator/auditor backend emits, before
//! it has survived verification/consensus/critique and become a real
//! [`miesc_core::finding::Finding`].

use miesc_core::finding::{Severity, TaxonomyId};

/// A finding proposed by an LLM backend, not yet corroborated.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFinding {
    pub normalized_type: String,
    pub title: String,
    pub severity: Severity,
    pub confidence: f64,
    pub taxonomy: Vec<TaxonomyId>,
    pub line: Option<u32>,
    pub function_name: Option<String>,
    pub rationale: Option<String>,
    /// Which backend produced this candidate; used by ensemble voting to
    /// attribute weight.
    pub source_backend: String,
}

/// Parses the `{"findings": [...]}` shape every generator/auditor role
/// prompt asks for. Malformed entries are skipped rather than failing the
/// whole batch — one bad JSON object from a model shouldn't discard every
/// other candidate it produced.
#[must_use]
pub fn parse_candidates(raw: &str, source_backend: &str) -> Vec<CandidateFinding> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };
    let Some(findings) = value.get("findings").and_then(|f| f.as_array()) else {
        return Vec::new();
    };

    findings
        .iter()
        .filter_map(|entry| parse_one_candidate(entry, source_backend))
        .collect()
}

fn parse_one_candidate(entry: &serde_json::Value, source_backend: &str) -> Option<CandidateFinding> {
    let normalized_type = entry.get("normalized_type")?.as_str()?.to_string();
    let title = entry
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or(&normalized_type)
        .to_string();
    let severity = entry
        .get("severity")
        .and_then(|v| v.as_str())
        .map(parse_severity)
        .unwrap_or(Severity::Medium);
    let confidence = entry
        .get("confidence")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.5);
    let taxonomy = entry
        .get("swc")
        .and_then(|v| v.as_str())
        .map(|code| vec![TaxonomyId::Swc(code.to_string())])
        .unwrap_or_default();
    let line = entry
        .get("line")
        .and_then(serde_json::Value::as_u64)
        .map(|l| l as u32);
    let function_name = entry
        .get("function_name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let rationale = entry
        .get("rationale")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Some(CandidateFinding {
        normalized_type,
        title,
        severity,
        confidence,
        taxonomy,
        line,
        function_name,
        rationale,
        source_backend: source_backend.to_string(),
    })
}

fn parse_severity(raw: &str) -> Severity {
    match raw.to_ascii_uppercase().as_str() {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "MEDIUM" => Severity::Medium,
        "LOW" => Severity::Low,
        _ => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_findings_array() {
        let raw = r#"{"findings": [{"normalized_type": "reentrancy_naive", "title": "Reentrancy", "severity": "HIGH", "swc": "107", "confidence": 0.6}]}"#;
        let candidates = parse_candidates(raw, "local");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].normalized_type, "reentrancy_naive");
        assert_eq!(candidates[0].severity, Severity::High);
        assert_eq!(candidates[0].taxonomy, vec![TaxonomyId::Swc("107".to_string())]);
        assert_eq!(candidates[0].source_backend, "local");
    }

    #[test]
    fn skips_entries_missing_normalized_type() {
        let raw = r#"{"findings": [{"title": "no type"}]}"#;
        assert!(parse_candidates(raw, "local").is_empty());
    }

    #[test]
    fn malformed_json_yields_empty_list() {
        assert!(parse_candidates("not json", "local").is_empty());
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let raw = r#"{"findings": [{"normalized_type": "unknown_pattern"}]}"#;
        let candidates = parse_candidates(raw, "local");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].severity, Severity::Medium);
        assert!((candidates[0].confidence - 0.5).abs() < f64::EPSILON);
    }
}
