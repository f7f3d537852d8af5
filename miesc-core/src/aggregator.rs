//! Finding aggregation and correlation: merges findings from every adapter
//! that ran into a single deduplicated set, fusing confidence across
//! corroborating sources and quarantining malformed input rather than
//! aborting the run.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{AggregatorError, ErrorRecord, ErrorScope};
use crate::finding::{Confidence, Finding, FindingStatus, Location, SemanticKey, TaxonomyId};
use crate::taxonomy;

/// Result of a single aggregation pass: the merged, deduplicated findings
/// plus a record of anything quarantined along the way.
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub findings: Vec<Finding>,
    pub rejected: Vec<ErrorRecord>,
}

/// Merges raw findings from one or more adapters into a deduplicated set.
///
/// Findings sharing a [`SemanticKey`] are merged into one: the surviving
/// finding keeps the highest severity observed, a noisy-OR fusion of every
/// contributing confidence score, the union of taxonomy IDs and provenance
/// records, and a corroboration count equal to the number of distinct
/// adapters that reported it.
///
/// A finding that fails the structural sanity check (empty normalized type,
/// confidence or severity impossible to reconcile) is quarantined into
/// `rejected` with status [`FindingStatus::Rejected`] rather than dropped or
/// allowed to abort aggregation for the rest of the batch.
pub fn aggregate(raw: Vec<Finding>) -> AggregationReport {
    let mut groups: FxHashMap<SemanticKey, Vec<Finding>> = FxHashMap::default();
    let mut rejected = Vec::new();

    for mut finding in raw {
        match validate(&finding) {
            Ok(()) => {
                canonicalize_normalized_type(&mut finding);
                backfill_taxonomy(&mut finding);
                groups.entry(finding.semantic_key()).or_default().push(finding);
            }
            Err(err) => {
                warn!(reason = %err, "quarantining malformed finding");
                rejected.push(
                    ErrorRecord::new(ErrorScope::Aggregator, err.to_string())
                        .with_tag("rejected_finding"),
                );
            }
        }
    }

    let findings = groups.into_values().map(merge_group).collect();

    AggregationReport { findings, rejected }
}

/// Folds `finding.normalized_type` into its canonical form per the synonym
/// dictionary (spec.md §4.4 step 3: derived from `type ∪ swc_id ∪ cwe_id`),
/// so two adapters tagging the same underlying weakness with different
/// tool-specific aliases land on the same semantic key. Run before taxonomy
/// backfill so that step looks up the already-canonical type.
fn canonicalize_normalized_type(finding: &mut Finding) {
    let swc_id = finding.taxonomy.iter().find_map(|id| match id {
        TaxonomyId::Swc(code) => Some(format!("SWC-{code}")),
        _ => None,
    });
    let cwe_id = finding.taxonomy.iter().find_map(|id| match id {
        TaxonomyId::Cwe(code) => Some(format!("CWE-{code}")),
        _ => None,
    });
    finding.normalized_type =
        taxonomy::canonicalize_type(&finding.normalized_type, swc_id.as_deref(), cwe_id.as_deref());
}

/// Fills in `swc_id`/`cwe_id` taxonomy entries a finding is missing, from the
/// canonical synonym dictionary keyed on `normalized_type`. An adapter that
/// already attached taxonomy IDs of its own is left untouched; this only
/// supplements findings whose upstream tool didn't carry taxonomy mapping.
fn backfill_taxonomy(finding: &mut Finding) {
    if !finding.taxonomy.is_empty() {
        return;
    }
    for id in taxonomy::synonym_taxonomy_for_type(&finding.normalized_type) {
        if !finding.taxonomy.contains(&id) {
            finding.taxonomy.push(id);
        }
    }
}

fn validate(finding: &Finding) -> Result<(), AggregatorError> {
    if finding.normalized_type.trim().is_empty() {
        let adapter = finding
            .provenance
            .first()
            .map(|p| p.adapter.clone())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(AggregatorError::MalformedFinding {
            adapter,
            reason: "normalized_type is empty".to_string(),
        });
    }
    if finding.location.file.trim().is_empty() {
        let adapter = finding
            .provenance
            .first()
            .map(|p| p.adapter.clone())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(AggregatorError::MalformedFinding {
            adapter,
            reason: "location.file is empty".to_string(),
        });
    }
    Ok(())
}

fn merge_group(mut group: Vec<Finding>) -> Finding {
    debug_assert!(!group.is_empty());

    // Distinct adapters corroborating this semantic key, counted before any
    // mutation so duplicate reports from the same adapter across retries
    // don't inflate the count.
    let distinct_adapters: std::collections::HashSet<&str> = group
        .iter()
        .flat_map(|f| f.provenance.iter().map(|p| p.adapter.as_str()))
        .collect();
    let corroboration_count = u32::try_from(distinct_adapters.len()).unwrap_or(u32::MAX).max(1);

    let fused_confidence = Confidence::fuse(group.iter().map(|f| &f.confidence));
    let any_high_confidence_constituent = group
        .iter()
        .any(|f| f.confidence.score() >= VALIDATED_CONFIDENCE_THRESHOLD);
    let any_constituent_validated = group.iter().any(|f| f.status == FindingStatus::Validated);
    // Location is selected independently of the severity sort below: spec.md
    // §4.4 step 5 wants the narrowest location among constituents, ties
    // broken by earliest tool, not whichever constituent happens to carry
    // the highest severity.
    let selected_location = select_location(&group);

    group.sort_by(|a, b| b.severity.cmp(&a.severity));
    let mut survivor = group.remove(0);
    survivor.location = selected_location;
    for other in group {
        for taxonomy_id in other.taxonomy {
            if !survivor.taxonomy.contains(&taxonomy_id) {
                survivor.taxonomy.push(taxonomy_id);
            }
        }
        survivor.provenance.extend(other.provenance);
        if other.description.len() > survivor.description.len() {
            survivor.description = other.description;
        }
    }

    survivor.confidence = fused_confidence;
    survivor.corroboration_count = corroboration_count;
    // A finding is validated once corroborated by more than one distinct
    // adapter, once any single constituent already cleared the high-
    // confidence bar on its own, or once a validator adapter (e.g. an LLM
    // verifier) marked a constituent validated directly. A group of size
    // one that meets none of these stays raw — no fake promotion.
    survivor.status = if corroboration_count >= 2 || any_high_confidence_constituent || any_constituent_validated {
        FindingStatus::Validated
    } else {
        FindingStatus::Raw
    };
    survivor
}

/// Picks the narrowest location among a merge group's constituents, ties
/// broken by earliest tool (the group's original order, before the severity
/// sort that follows). The data model tracks a point location rather than an
/// explicit line range, so "narrowest" is approximated by precision: a
/// location carrying a function name and column is treated as narrower than
/// one carrying neither.
fn select_location(group: &[Finding]) -> Location {
    group
        .iter()
        .enumerate()
        .min_by(|(index_a, a), (index_b, b)| {
            location_narrowness(&a.location)
                .cmp(&location_narrowness(&b.location))
                .then(index_a.cmp(index_b))
        })
        .map(|(_, finding)| finding.location.clone())
        .expect("merge group is non-empty")
}

/// Lower is narrower: starts at 2 and subtracts one for each precision
/// signal (`function_name`, `column`) the location carries.
fn location_narrowness(location: &Location) -> u8 {
    let mut narrowness = 2u8;
    if location.function_name.is_some() {
        narrowness -= 1;
    }
    if location.column.is_some() {
        narrowness -= 1;
    }
    narrowness
}

/// Confidence score at or above which a single constituent is enough to
/// promote a merged finding straight to [`FindingStatus::Validated`], per
/// the "any constituent has confidence ≥ 0.85" rule.
const VALIDATED_CONFIDENCE_THRESHOLD: f64 = 0.85;
