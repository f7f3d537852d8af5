//! Regex-based heuristic pattern scanning, a layer 1 adapter covering three
//! of the most common Solidity weaknesses: `tx.origin` authorization
//! (SWC-115), unchecked low-level call return values (SWC-104), and a naive
//! syntactic reentrancy heuristic (SWC-107, call-then-state-write within the
//! same function).

use std::path::Path;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;

use crate::adapter::{Adapter, AnalysisResult, AnalyzeOptions};
use crate::error::AdapterError;
use crate::finding::{Confidence, Finding, FindingStatus, Location, Provenance, Severity, TaxonomyId};
use crate::tool::{ToolMetadata, ToolStatus};

static TX_ORIGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tx\.origin").expect("valid regex"));
static UNCHECKED_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[\w.]+\.call(?:\{[^}]*\})?\([^;]*\)\s*;").expect("valid regex")
});
static EXTERNAL_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.call\{|\.call\(|\.transfer\(|\.send\(").expect("valid regex")
});
static STATE_WRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[A-Za-z_]\w*(?:\[[^\]]*\])?\s*[-+*/]?=\s*[^=]").expect("valid regex")
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+(\w+)\s*\(").expect("valid regex")
});

/// A match produced during scanning, before normalization.
#[derive(serde::Serialize, serde::Deserialize)]
struct RawMatch {
    rule: &'static str,
    line: u32,
    function_name: Option<String>,
}

pub struct PatternStaticAdapter {
    metadata: ToolMetadata,
}

impl PatternStaticAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata {
                name: "pattern-static".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                vendor: None,
                homepage: None,
                default_layer: 1,
                category: crate::tool::ToolCategory::Static,
                detection_types: vec![
                    "tx_origin_authorization".to_string(),
                    "unchecked_call_return_value".to_string(),
                    "reentrancy_naive".to_string(),
                ],
                is_optional: true,
                license: "MIT".to_string(),
                default_timeout_seconds: 10,
                requires_external_binary: false,
                requires_network: false,
                description: "Regex heuristics for tx.origin auth, unchecked call return values, and naive reentrancy.".to_string(),
            },
        }
    }
}

impl Default for PatternStaticAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks which function body (by name, start line) each source line falls
/// within, using brace depth — good enough for the flat, rarely-nested
/// Solidity functions this heuristic targets.
fn function_spans(source: &str) -> Vec<(String, usize, usize)> {
    let mut spans = Vec::new();
    let mut current: Option<(String, usize, i32)> = None;
    for (idx, line) in source.lines().enumerate() {
        if current.is_none() {
            if let Some(captures) = FUNCTION_RE.captures(line) {
                current = Some((captures[1].to_string(), idx, 0));
            }
        }
        if let Some((name, start, depth)) = current.as_mut() {
            *depth += line.matches('{').count() as i32 - line.matches('}').count() as i32;
            if *depth <= 0 && line.contains('{') {
                spans.push((name.clone(), *start, idx));
                current = None;
            } else if *depth <= 0 && idx > *start && line.contains('}') {
                spans.push((name.clone(), *start, idx));
                current = None;
            }
        }
    }
    spans
}

fn function_for_line(spans: &[(String, usize, usize)], line_idx: usize) -> Option<String> {
    spans
        .iter()
        .find(|(_, start, end)| line_idx >= *start && line_idx <= *end)
        .map(|(name, _, _)| name.clone())
}

#[async_trait]
impl Adapter for PatternStaticAdapter {
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

        let spans = function_spans(&source);
        let lines: Vec<&str> = source.lines().collect();
        let mut matches = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if TX_ORIGIN_RE.is_match(line) {
                matches.push(RawMatch {
                    rule: "tx_origin_auth",
                    line: (idx + 1) as u32,
                    function_name: function_for_line(&spans, idx),
                });
            }
            if UNCHECKED_CALL_RE.is_match(line) && !line.contains("require(") {
                matches.push(RawMatch {
                    rule: "unchecked_call",
                    line: (idx + 1) as u32,
                    function_name: function_for_line(&spans, idx),
                });
            }
        }

        // Naive reentrancy: an external call followed, later in the same
        // function body, by a state write (balance/mapping update).
        for (name, start, end) in &spans {
            let mut call_line = None;
            for idx in *start..=*end {
                let Some(line) = lines.get(idx) else { continue };
                if call_line.is_none() && EXTERNAL_CALL_RE.is_match(line) {
                    call_line = Some(idx);
                    continue;
                }
                if let Some(call_idx) = call_line {
                    if idx > call_idx && STATE_WRITE_RE.is_match(line) {
                        matches.push(RawMatch {
                            rule: "reentrancy_naive",
                            line: (call_idx + 1) as u32,
                            function_name: Some(name.clone()),
                        });
                        break;
                    }
                }
            }
        }

        let raw = serde_json::json!({
            "file": contract_path.display().to_string(),
            "matches": matches,
        });
        AnalysisResult::ok(started.elapsed(), raw)
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<Vec<Finding>, AdapterError> {
        let file = raw
            .get("file")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::NormalizationFailed("missing file".to_string()))?
            .to_string();
        let matches: Vec<RawMatch> = raw
            .get("matches")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AdapterError::NormalizationFailed(e.to_string()))?
            .unwrap_or_default();

        let findings = matches
            .into_iter()
            .map(|m| self.finding_for(&file, m))
            .collect();
        Ok(findings)
    }
}

impl PatternStaticAdapter {
    fn finding_for(&self, file: &str, m: RawMatch) -> Finding {
        let (normalized_type, title, description, severity, confidence, taxonomy) = match m.rule {
            "tx_origin_auth" => (
                "tx_origin_authorization",
                "Authorization through tx.origin",
                "Using tx.origin for authorization is vulnerable to phishing via an intermediate contract.",
                Severity::High,
                0.7,
                vec![TaxonomyId::Swc("115".to_string()), TaxonomyId::Cwe("284".to_string())],
            ),
            "unchecked_call" => (
                "unchecked_call_return_value",
                "Unchecked low-level call return value",
                "The return value of a low-level .call() is not checked, so a failed call is silently ignored.",
                Severity::Medium,
                0.55,
                vec![TaxonomyId::Swc("104".to_string())],
            ),
            _ => (
                "reentrancy_naive",
                "Possible reentrancy",
                "An external call is followed by a state write in the same function, a classic reentrancy shape.",
                Severity::High,
                0.45,
                vec![TaxonomyId::Swc("107".to_string()), TaxonomyId::Cwe("841".to_string())],
            ),
        };

        Finding {
            id: uuid::Uuid::new_v4(),
            normalized_type: normalized_type.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            severity,
            confidence: Confidence::new(confidence),
            taxonomy,
            location: Location {
                file: file.to_string(),
                line: m.line,
                column: None,
                function_name: m.function_name,
            },
            provenance: vec![Provenance {
                adapter: self.metadata.name.clone(),
                layer: self.metadata.default_layer,
                tool_version: None,
                raw_rule_id: Some(m.rule.to_string()),
            }],
            status: FindingStatus::Raw,
            corroboration_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn findings_for(source: &str) -> Vec<Finding> {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), source).unwrap();
        let adapter = PatternStaticAdapter::new();
        let result = adapter
            .analyze(file.path(), &AnalyzeOptions::default(), Duration::from_secs(1))
            .await;
        adapter.normalize(&result.raw_output).unwrap()
    }

    #[tokio::test]
    async fn detects_tx_origin_authorization() {
        let source = "function auth() public {\n  require(tx.origin == owner);\n}\n";
        let findings = findings_for(source).await;
        assert!(findings.iter().any(|f| f.normalized_type == "tx_origin_authorization"));
    }

    #[tokio::test]
    async fn detects_reentrancy_shape() {
        let source = concat!(
            "function withdraw(uint amount) public {\n",
            "  msg.sender.call{value: amount}(\"\");\n",
            "  balances[msg.sender] = 0;\n",
            "}\n",
        );
        let findings = findings_for(source).await;
        assert!(findings.iter().any(|f| f.normalized_type == "reentrancy_naive"));
    }

    #[tokio::test]
    async fn clean_contract_yields_no_findings() {
        let source = concat!(
            "function transfer(address to, uint amount) public {\n",
            "  require(amount > 0);\n",
            "  balances[msg.sender] -= amount;\n",
            "  balances[to] += amount;\n",
            "}\n",
        );
        let findings = findings_for(source).await;
        assert!(findings.is_empty());
    }
}
