//! Floating-pragma detection (SWC-103), a layer 2 adapter.

use std::path::Path;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;

use crate::adapter::{Adapter, AnalysisResult, AnalyzeOptions};
use crate::error::AdapterError;
use crate::finding::{Confidence, Finding, FindingStatus, Location, Provenance, Severity, TaxonomyId};
use crate::tool::{ToolMetadata, ToolStatus};

static PRAGMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*pragma\s+solidity\s+([^;]+);").expect("valid regex"));

/// Flags a `pragma solidity` directive that does not pin an exact version
/// (i.e. uses `^`, `>=`, `>`, or a range), which lets the contract be
/// compiled by a compiler version its author never tested against.
pub struct PragmaAdapter {
    metadata: ToolMetadata,
}

impl PragmaAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata {
                name: "pragma-check".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                vendor: None,
                homepage: None,
                default_layer: 2,
                category: crate::tool::ToolCategory::Static,
                detection_types: vec!["floating_pragma".to_string()],
                is_optional: true,
                license: "MIT".to_string(),
                default_timeout_seconds: 5,
                requires_external_binary: false,
                requires_network: false,
                description: "Detects floating solidity pragma declarations (SWC-103).".to_string(),
            },
        }
    }
}

impl Default for PragmaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for PragmaAdapter {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus::Available
    }

    async fn analyze(
        &self,
        contract_path: &Path,
        _options: &AnalyzeOptions,
        _timeout: Duration,
    ) -> AnalysisResult {
        let started = Instant::now();
        let source = match std::fs::read_to_string(contract_path) {
            Ok(source) => source,
            Err(err) => return AnalysisResult::error(started.elapsed(), err.to_string()),
        };

        let mut matches = Vec::new();
        for (line_idx, line) in source.lines().enumerate() {
            if let Some(captures) = PRAGMA_RE.captures(line) {
                let version_spec = captures[1].trim().to_string();
                if is_floating(&version_spec) {
                    matches.push(serde_json::json!({
                        "line": line_idx + 1,
                        "version_spec": version_spec,
                    }));
                }
            }
        }

        AnalysisResult::ok(
            started.elapsed(),
            serde_json::json!({ "file": contract_path.display().to_string(), "matches": matches }),
        )
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<Vec<Finding>, AdapterError> {
        let file = raw
            .get("file")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::NormalizationFailed("missing file".to_string()))?
            .to_string();
        let matches = raw
            .get("matches")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::NormalizationFailed("missing matches".to_string()))?;

        let mut findings = Vec::with_capacity(matches.len());
        for m in matches {
            let line = m.get("line").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
            let version_spec = m
                .get("version_spec")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            findings.push(Finding {
                id: uuid::Uuid::new_v4(),
                normalized_type: "floating_pragma".to_string(),
                title: "Floating pragma".to_string(),
                description: format!(
                    "pragma solidity {version_spec} does not pin an exact compiler version"
                ),
                severity: Severity::Low,
                confidence: Confidence::new(0.6),
                taxonomy: vec![TaxonomyId::Swc("103".to_string())],
                location: Location {
                    file: file.clone(),
                    line,
                    column: None,
                    function_name: None,
                },
                provenance: vec![Provenance {
                    adapter: self.metadata.name.clone(),
                    layer: self.metadata.default_layer,
                    tool_version: None,
                    raw_rule_id: Some("floating-pragma".to_string()),
                }],
                status: FindingStatus::Raw,
                corroboration_count: 1,
            });
        }
        Ok(findings)
    }
}

fn is_floating(version_spec: &str) -> bool {
    version_spec.starts_with('^')
        || version_spec.starts_with(">=")
        || version_spec.starts_with('>')
        || version_spec.contains('<')
        || version_spec.split_whitespace().count() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn analyze_source(source: &str) -> Vec<Finding> {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), source).unwrap();
        let adapter = PragmaAdapter::new();
        let result = adapter
            .analyze(file.path(), &AnalyzeOptions::default(), Duration::from_secs(1))
            .await;
        adapter.normalize(&result.raw_output).unwrap()
    }

    #[tokio::test]
    async fn detects_caret_pragma_as_floating() {
        let findings = analyze_source("pragma solidity ^0.8.0;\ncontract C {}\n").await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].normalized_type, "floating_pragma");
    }

    #[tokio::test]
    async fn pinned_pragma_is_not_flagged() {
        let findings = analyze_source("pragma solidity 0.8.19;\ncontract C {}\n").await;
        assert!(findings.is_empty());
    }
}
