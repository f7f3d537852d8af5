//! The finding data model: the common currency every adapter normalizes
//! into and the aggregator deduplicates over.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity, ordered `Critical > High > Medium > Low > Info` for sorting and
/// for the aggregator's "keep the more severe duplicate" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Rank used when two findings are equal in every other respect: higher
    /// is more severe. `Ord` on the enum already gives this (declaration
    /// order is ascending), this method just names the intent at call sites.
    #[must_use]
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        };
        f.write_str(s)
    }
}

/// A coarse band derived from the numeric confidence score, used for display
/// and for threshold-based filtering without re-deriving cutoffs at every
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

/// A numeric confidence score in `[0.0, 1.0]` plus its derived band.
///
/// `Confidence::new` clamps out-of-range input rather than erroring: a
/// misbehaving adapter should degrade the value, not abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    score: f64,
}

impl Confidence {
    /// Band cutoffs per spec.md §4.4's noisy-OR snapping rule: `HIGH >= 0.8`,
    /// `MEDIUM >= 0.5`, else `LOW`.
    pub const LOW_HIGH_CUTOFF: f64 = 0.5;
    pub const HIGH_CUTOFF: f64 = 0.8;

    #[must_use]
    pub fn new(score: f64) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn score(self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn band(self) -> ConfidenceBand {
        if self.score >= Self::HIGH_CUTOFF {
            ConfidenceBand::High
        } else if self.score >= Self::LOW_HIGH_CUTOFF {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    /// Noisy-OR fusion of independent confidence estimates for the same
    /// underlying claim: `1 - product(1 - c_i)`. Monotonically non-decreasing
    /// in the number of corroborating sources, and never exceeds 1.0.
    #[must_use]
    pub fn fuse<'a>(confidences: impl IntoIterator<Item = &'a Confidence>) -> Confidence {
        let complement_product = confidences
            .into_iter()
            .fold(1.0_f64, |acc, c| acc * (1.0 - c.score));
        Confidence::new(1.0 - complement_product)
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}

/// A taxonomy identifier attached to a finding: SWC registry, CWE, or OWASP
/// Smart Contract Top 10.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "id", rename_all = "lowercase")]
pub enum TaxonomyId {
    Swc(String),
    Cwe(String),
    Owasp(String),
}

impl std::fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomyId::Swc(id) => write!(f, "SWC-{id}"),
            TaxonomyId::Cwe(id) => write!(f, "CWE-{id}"),
            TaxonomyId::Owasp(id) => write!(f, "OWASP-{id}"),
        }
    }
}

/// Records where a finding (or a merged duplicate group) came from, so a
/// human reviewer can trace a triage decision back to its source tool(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub adapter: String,
    pub layer: u8,
    pub tool_version: Option<String>,
    pub raw_rule_id: Option<String>,
}

/// Precise source location for a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
    pub function_name: Option<String>,
}

impl Location {
    /// Basename of `file`, used for the dedup semantic key so that relative
    /// vs. absolute path differences between adapters don't defeat
    /// deduplication.
    #[must_use]
    pub fn file_basename(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }

    /// Bucketed line number: `line / 3`. Findings on nearby lines for the
    /// same normalized type and function are treated as the same
    /// observation, since different tools anchor on slightly different AST
    /// nodes for what is semantically one issue.
    #[must_use]
    pub fn line_bucket(&self) -> u32 {
        self.line / 3
    }
}

/// Disposition of a finding after aggregation and any applicable inline
/// suppression.
///
/// An adapter always emits [`FindingStatus::Raw`]; the aggregator is the
/// only component allowed to promote a finding to [`FindingStatus::Validated`]
/// (per the corroboration/confidence rule in `aggregator::merge_group`) or
/// flip it to [`FindingStatus::Suppressed`] (inline suppression comment) or
/// [`FindingStatus::Rejected`] (failed structural validation). `Suppressed`
/// is a supplement to the upstream `{raw, validated, rejected,
/// duplicate-merged}` vocabulary: tracking suppression as its own status,
/// rather than silently dropping the finding, keeps it auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Raw,
    Validated,
    Suppressed,
    /// Failed normalization or validation; retained for audit rather than
    /// silently dropped.
    Rejected,
}

/// A single normalized finding, the unit the aggregator correlates and the
/// RAG/LLM layers enrich.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: uuid::Uuid,
    pub normalized_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub taxonomy: Vec<TaxonomyId>,
    pub location: Location,
    pub provenance: Vec<Provenance>,
    pub status: FindingStatus,
    /// Populated only once the finding has been merged into a duplicate
    /// group; counts the number of independent adapters that reported it.
    pub corroboration_count: u32,
}

/// The deduplication key the aggregator correlates on:
/// `(normalized_type, file_basename, line_bucket, function_name_or_none)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticKey {
    pub normalized_type: String,
    pub file_basename: String,
    pub line_bucket: u32,
    pub function_name: Option<String>,
}

impl Finding {
    #[must_use]
    pub fn semantic_key(&self) -> SemanticKey {
        SemanticKey {
            normalized_type: self.normalized_type.clone(),
            file_basename: self.location.file_basename().to_string(),
            line_bucket: self.location.line_bucket(),
            function_name: self.location.function_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn confidence_clamps_out_of_range() {
        assert_eq!(Confidence::new(1.5).score(), 1.0);
        assert_eq!(Confidence::new(-0.2).score(), 0.0);
    }

    #[test]
    fn confidence_bands_match_cutoffs() {
        assert_eq!(Confidence::new(0.1).band(), ConfidenceBand::Low);
        assert_eq!(Confidence::new(0.5).band(), ConfidenceBand::Medium);
        assert_eq!(Confidence::new(0.9).band(), ConfidenceBand::High);
    }

    #[test]
    fn noisy_or_fusion_increases_with_corroboration() {
        let a = Confidence::new(0.5);
        let b = Confidence::new(0.5);
        let fused = Confidence::fuse([&a, &b]);
        assert!((fused.score() - 0.75).abs() < 1e-9);
        assert!(fused.score() > a.score());
    }

    #[test]
    fn noisy_or_fusion_of_empty_set_is_zero() {
        let fused = Confidence::fuse(std::iter::empty());
        assert_eq!(fused.score(), 0.0);
    }

    #[test]
    fn line_bucket_groups_nearby_lines() {
        let loc_a = Location {
            file: "Vault.sol".into(),
            line: 40,
            column: None,
            function_name: Some("withdraw".into()),
        };
        let loc_b = Location {
            file: "Vault.sol".into(),
            line: 41,
            column: None,
            function_name: Some("withdraw".into()),
        };
        assert_eq!(loc_a.line_bucket(), loc_b.line_bucket());
    }

    #[test]
    fn file_basename_strips_directories() {
        let loc = Location {
            file: "contracts/defi/Vault.sol".into(),
            line: 1,
            column: None,
            function_name: None,
        };
        assert_eq!(loc.file_basename(), "Vault.sol");
    }
}
