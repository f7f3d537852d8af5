//! Inline suppression comments: `// miesc-ignore: SWC-107` (or a bare
//! `// miesc-ignore` to suppress every finding on the line), plus the
//! `<tool>-disable-next-line <rule>` convention some external analyzers
//! already use, let a contract author silence a specific finding without
//! touching run configuration.
//!
//! A suppression comment on line `N` applies to findings at line `N` or at
//! the line immediately following it, matching the common pattern of
//! annotating the line above the one actually flagged.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::finding::{Finding, FindingStatus, TaxonomyId};

static SUPPRESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)//\s*miesc-ignore(?:\s*:\s*([A-Za-z0-9_,\-\s]+))?").expect("valid regex")
});

/// `slither-disable-next-line reentrancy-eth`, `mythril-disable-next-line`,
/// etc. — the convention several existing analyzers already use. Unlike
/// `miesc-ignore`, this form is *always* relative to the following line, but
/// [`SuppressionTable::directives_for`] already consults both `line` and
/// `line - 1`, so indexing it the same way as `miesc-ignore` is correct.
static TOOL_DISABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)//\s*[\w.-]+-disable-next-line(?:\s+([A-Za-z0-9_,\-\s]+))?").expect("valid regex")
});

/// One suppression directive extracted from source text.
#[derive(Debug, Clone)]
struct Directive {
    /// `None` means "suppress everything on this line".
    taxonomy_ids: Option<Vec<String>>,
}

/// A parsed table of suppression directives for one contract source file,
/// indexed by the line they appear on for O(1) lookup per finding.
pub struct SuppressionTable {
    by_line: FxHashMap<u32, Vec<Directive>>,
}

impl SuppressionTable {
    /// Parses suppression comments out of `source`. Never fails: a comment
    /// that doesn't parse as a recognizable directive list is treated as a
    /// blanket suppression for that line, which is the safer default for a
    /// triage tool (false negatives from a malformed directive are worse
    /// than an accidental narrow one).
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut by_line: FxHashMap<u32, Vec<Directive>> = FxHashMap::default();
        for (idx, line) in source.lines().enumerate() {
            let Some(captures) = SUPPRESSION_RE
                .captures(line)
                .or_else(|| TOOL_DISABLE_RE.captures(line))
            else {
                continue;
            };
            let line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            let taxonomy_ids = captures.get(1).map(|m| {
                m.as_str()
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            });
            by_line.entry(line_no).or_default().push(Directive { taxonomy_ids });
        }
        Self { by_line }
    }

    fn directives_for(&self, line: u32) -> impl Iterator<Item = &Directive> {
        let prev = line.checked_sub(1);
        self.by_line
            .get(&line)
            .into_iter()
            .chain(prev.and_then(|p| self.by_line.get(&p)))
            .flatten()
    }

    /// Whether any directive applicable to `finding`'s location suppresses
    /// it, either as a blanket suppression or by naming one of its taxonomy
    /// IDs.
    #[must_use]
    pub fn suppresses(&self, finding: &Finding) -> bool {
        self.directives_for(finding.location.line).any(|d| {
            match &d.taxonomy_ids {
                None => true,
                Some(ids) => finding
                    .taxonomy
                    .iter()
                    .any(|t| ids.iter().any(|id| taxonomy_matches(t, id))),
            }
        })
    }

    /// Applies suppression in place, flipping [`FindingStatus::Raw`] or
    /// [`FindingStatus::Validated`] findings covered by a directive to
    /// [`FindingStatus::Suppressed`]. Findings already [`FindingStatus::Rejected`]
    /// are left untouched.
    pub fn apply(&self, findings: &mut [Finding]) {
        for finding in findings.iter_mut() {
            let is_live = matches!(finding.status, FindingStatus::Raw | FindingStatus::Validated);
            if is_live && self.suppresses(finding) {
                finding.status = FindingStatus::Suppressed;
            }
        }
    }
}

fn taxonomy_matches(id: &TaxonomyId, token: &str) -> bool {
    let rendered = id.to_string().to_uppercase();
    let token = token.to_uppercase();
    rendered == token || rendered == format!("{}-{}", scheme_prefix(id), token)
}

fn scheme_prefix(id: &TaxonomyId) -> &'static str {
    match id {
        TaxonomyId::Swc(_) => "SWC",
        TaxonomyId::Cwe(_) => "CWE",
        TaxonomyId::Owasp(_) => "OWASP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Confidence, Location, Severity};

    fn finding_at(line: u32, taxonomy: Vec<TaxonomyId>) -> Finding {
        Finding {
            id: uuid::Uuid::new_v4(),
            normalized_type: "reentrancy".to_string(),
            title: "Reentrancy".to_string(),
            description: String::new(),
            severity: Severity::High,
            confidence: Confidence::new(0.8),
            taxonomy,
            location: Location {
                file: "Vault.sol".to_string(),
                line,
                column: None,
                function_name: Some("withdraw".to_string()),
            },
            provenance: vec![],
            status: FindingStatus::Raw,
            corroboration_count: 1,
        }
    }

    #[test]
    fn blanket_suppression_on_same_line() {
        let source = "function withdraw() public { // miesc-ignore\n  x();\n}\n";
        let table = SuppressionTable::parse(source);
        let finding = finding_at(1, vec![TaxonomyId::Swc("107".to_string())]);
        assert!(table.suppresses(&finding));
    }

    #[test]
    fn suppression_applies_to_following_line() {
        let source = "// miesc-ignore: SWC-107\nfunction withdraw() public { x(); }\n";
        let table = SuppressionTable::parse(source);
        let finding = finding_at(2, vec![TaxonomyId::Swc("107".to_string())]);
        assert!(table.suppresses(&finding));
    }

    #[test]
    fn targeted_suppression_does_not_affect_other_taxonomy() {
        let source = "// miesc-ignore: SWC-107\nfunction withdraw() public { x(); }\n";
        let table = SuppressionTable::parse(source);
        let finding = finding_at(2, vec![TaxonomyId::Swc("115".to_string())]);
        assert!(!table.suppresses(&finding));
    }

    #[test]
    fn tool_disable_next_line_suppresses_following_line() {
        let source = "// slither-disable-next-line reentrancy-eth\nfunction withdraw() public { x(); }\n";
        let table = SuppressionTable::parse(source);
        let finding = finding_at(2, vec![TaxonomyId::Swc("107".to_string())]);
        assert!(table.suppresses(&finding));
    }

    #[test]
    fn apply_flips_status_to_suppressed() {
        let source = "// miesc-ignore\nfunction withdraw() public { x(); }\n";
        let table = SuppressionTable::parse(source);
        let mut findings = vec![finding_at(2, vec![TaxonomyId::Swc("107".to_string())])];
        table.apply(&mut findings);
        assert_eq!(findings[0].status, FindingStatus::Suppressed);
    }
}
