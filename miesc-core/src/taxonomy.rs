//! Static lookup tables for the vulnerability taxonomies findings are tagged
//! against: the Smart Contract Weakness Classification registry, CWE, and
//! the OWASP Smart Contract Top 10. Used both to validate taxonomy IDs
//! attached to findings and to resolve a short human-readable title for
//! display and for RAG document lookup keys.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

use crate::finding::TaxonomyId;

/// `(id, title)` pairs for the subset of SWC registry entries this system's
/// built-in adapters and RAG corpus reference directly. Not exhaustive of
/// the full registry — only the entries this crate has a concrete user for.
pub const SWC_ENTRIES: &[(&str, &str)] = &[
    ("100", "Function Default Visibility"),
    ("101", "Integer Overflow and Underflow"),
    ("103", "Floating Pragma"),
    ("104", "Unchecked Call Return Value"),
    ("105", "Unprotected Ether Withdrawal"),
    ("106", "Unprotected SELFDESTRUCT Instruction"),
    ("107", "Reentrancy"),
    ("112", "Delegatecall to Untrusted Callee"),
    ("113", "DoS with Failed Call"),
    ("114", "Transaction Order Dependence"),
    ("115", "Authorization through tx.origin"),
    ("116", "Block values as a proxy for time"),
    ("120", "Weak Sources of Randomness from Chain Attributes"),
    ("128", "DoS with Block Gas Limit"),
    ("131", "Presence of unused variables"),
    ("132", "Unexpected Ether balance"),
];

pub const CWE_ENTRIES: &[(&str, &str)] = &[
    ("20", "Improper Input Validation"),
    ("190", "Integer Overflow or Wraparound"),
    ("252", "Unchecked Return Value"),
    ("284", "Improper Access Control"),
    ("330", "Use of Insufficiently Random Values"),
    ("362", "Concurrent Execution using Shared Resource (Race Condition)"),
    ("367", "Time-of-check Time-of-use Race Condition"),
    ("400", "Uncontrolled Resource Consumption"),
    ("477", "Use of Obsolete Function"),
    ("682", "Incorrect Calculation"),
    ("703", "Improper Check or Handling of Exceptional Conditions"),
    ("787", "Out-of-bounds Write"),
    ("829", "Inclusion of Functionality from Untrusted Control Sphere"),
    ("841", "Improper Enforcement of Behavioral Workflow"),
];

pub const OWASP_SC_ENTRIES: &[(&str, &str)] = &[
    ("SC01", "Reentrancy Attacks"),
    ("SC02", "Integer Overflow and Underflow"),
    ("SC03", "Timestamp Dependence"),
    ("SC04", "Access Control Vulnerabilities"),
    ("SC05", "Unchecked External Calls"),
    ("SC06", "Denial of Service Attacks"),
    ("SC07", "Front-Running"),
    ("SC08", "Insecure Randomness"),
    ("SC09", "Business Logic Vulnerabilities"),
    ("SC10", "Improper Events and Logging"),
];

static SWC_INDEX: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| SWC_ENTRIES.iter().copied().collect());
static CWE_INDEX: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| CWE_ENTRIES.iter().copied().collect());
static OWASP_INDEX: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| OWASP_SC_ENTRIES.iter().copied().collect());

/// Resolves a [`TaxonomyId`] to its known title, if this crate recognizes
/// the ID. Unknown IDs resolve to `None` rather than an error — taxonomy
/// membership is advisory, not a validation gate on findings.
#[must_use]
pub fn title_for(id: &TaxonomyId) -> Option<&'static str> {
    match id {
        TaxonomyId::Swc(code) => SWC_INDEX.get(code.as_str()).copied(),
        TaxonomyId::Cwe(code) => CWE_INDEX.get(code.as_str()).copied(),
        TaxonomyId::Owasp(code) => OWASP_INDEX.get(code.as_str()).copied(),
    }
}

/// Whether a taxonomy ID is recognized by this crate's static tables. Used
/// by `miesc-llm`'s hallucination defense to strip taxonomy IDs an LLM
/// fabricated that don't correspond to any known entry.
#[must_use]
pub fn is_known(id: &TaxonomyId) -> bool {
    title_for(id).is_some()
}

/// Canonical synonym dictionary: each entry names one canonical vulnerability
/// type tag, the tool-specific aliases different adapters use for the exact
/// same underlying weakness, and the taxonomy IDs that canonical tag maps to.
///
/// Used two ways: [`canonicalize_type`] folds an adapter's raw tag — and,
/// when the tag alone isn't recognized, its already-attached taxonomy IDs —
/// into the one canonical tag the aggregator's semantic key correlates on
/// (spec.md §4.4 step 3, derived from `type ∪ swc_id ∪ cwe_id`);
/// [`synonym_taxonomy_for_type`] backfills taxonomy IDs for a finding that
/// already carries none (spec.md §4.4 step 2).
const TYPE_SYNONYM_GROUPS: &[(&str, &[&str], &[&str])] = &[
    ("reentrancy", &["reentrancy_naive", "cross_function_reentrancy"], &["SWC-107", "CWE-841"]),
    ("read_only_reentrancy", &[], &["CWE-841"]),
    ("tx_origin_authorization", &[], &["SWC-115", "CWE-477"]),
    ("unchecked_call_return_value", &["unchecked_external_call"], &["SWC-104", "CWE-252"]),
    ("unprotected_ether_withdrawal", &[], &["SWC-105"]),
    ("unprotected_selfdestruct", &[], &["SWC-106"]),
    ("delegatecall_to_untrusted", &[], &["SWC-112", "CWE-829"]),
    ("arbitrary_storage_write", &[], &["SWC-124", "CWE-787"]),
    ("dos_failed_call", &[], &["SWC-113", "CWE-400"]),
    ("dos_gas_limit", &[], &["SWC-128", "CWE-400"]),
    ("transaction_order_dependence", &[], &["SWC-114", "CWE-362"]),
    ("weak_randomness", &[], &["SWC-120", "CWE-330"]),
    ("timestamp_dependence", &[], &["SWC-116", "CWE-829"]),
    ("floating_pragma", &[], &["SWC-103"]),
    ("outdated_compiler", &[], &["SWC-102"]),
    ("integer_overflow", &[], &["SWC-101", "CWE-190"]),
    ("integer_underflow", &[], &["SWC-101", "CWE-190"]),
];

/// Alias (and canonical tag itself) -> canonical tag, built once from
/// [`TYPE_SYNONYM_GROUPS`].
static CANONICAL_TYPE_INDEX: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = FxHashMap::default();
    for (canonical, aliases, _) in TYPE_SYNONYM_GROUPS {
        map.insert(*canonical, *canonical);
        for alias in *aliases {
            map.insert(*alias, *canonical);
        }
    }
    map
});

/// Taxonomy ID string (e.g. `"SWC-107"`) -> canonical tag, built once from
/// [`TYPE_SYNONYM_GROUPS`]. Where two canonical groups happen to share a
/// taxonomy ID (e.g. `SWC-101` covers both `integer_overflow` and
/// `integer_underflow`), the first group listed wins; this only matters for
/// [`canonicalize_type`]'s taxonomy-ID fallback, not for the common case of
/// an already-recognized type tag.
static TAXONOMY_TO_CANONICAL_TYPE: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = FxHashMap::default();
    for (canonical, _, tax_ids) in TYPE_SYNONYM_GROUPS {
        for id in *tax_ids {
            map.entry(*id).or_insert(*canonical);
        }
    }
    map
});

/// Folds a raw adapter-reported type tag into its canonical form: an exact
/// alias match wins; failing that, `swc_id`/`cwe_id` (each formatted like
/// `"SWC-107"`/`"CWE-841"`) are checked against the reverse taxonomy index.
/// A tag this dictionary doesn't recognize at all — by itself or via its
/// taxonomy IDs — passes through unchanged: a bespoke tool-specific tag is
/// its own canonical form until this table grows an entry for it.
#[must_use]
pub fn canonicalize_type(raw_type: &str, swc_id: Option<&str>, cwe_id: Option<&str>) -> String {
    if let Some(canonical) = CANONICAL_TYPE_INDEX.get(raw_type) {
        return (*canonical).to_string();
    }
    for id in [swc_id, cwe_id].into_iter().flatten() {
        if let Some(canonical) = TAXONOMY_TO_CANONICAL_TYPE.get(id) {
            return (*canonical).to_string();
        }
    }
    raw_type.to_string()
}

/// Looks up the taxonomy IDs the synonym dictionary associates with
/// `normalized_type` (matching either a canonical tag or one of its
/// aliases), parsing each into a [`TaxonomyId`]. Returns an empty vec for a
/// type tag the dictionary doesn't recognize; the caller decides what to do
/// with that (typically: leave the finding's taxonomy as-is).
#[must_use]
pub fn synonym_taxonomy_for_type(normalized_type: &str) -> Vec<TaxonomyId> {
    TYPE_SYNONYM_GROUPS
        .iter()
        .find(|(canonical, aliases, _)| *canonical == normalized_type || aliases.contains(&normalized_type))
        .map(|(_, _, ids)| ids.iter().filter_map(|id| parse_taxonomy_id(id)).collect())
        .unwrap_or_default()
}

fn parse_taxonomy_id(id: &str) -> Option<TaxonomyId> {
    let (scheme, code) = id.split_once('-')?;
    match scheme {
        "SWC" => Some(TaxonomyId::Swc(code.to_string())),
        "CWE" => Some(TaxonomyId::Cwe(code.to_string())),
        "OWASP" => Some(TaxonomyId::Owasp(code.to_string())),
        _ => None,
    }
}

/// Vulnerability type tags that default to [`crate::finding::Severity::Critical`]
/// when an adapter's raw output didn't carry its own severity, per spec.md
/// §4.1's default table.
const CRITICAL_TYPES: &[&str] = &[
    "reentrancy",
    "reentrancy_naive",
    "cross_function_reentrancy",
    "arbitrary_storage_write",
    "unprotected_selfdestruct",
    "delegatecall_to_untrusted",
];

/// Type tags that default to [`crate::finding::Severity::High`] when not
/// already `CRITICAL_TYPES`, per the same table. Anything matching neither
/// list defaults to `MEDIUM`.
const HIGH_TYPES: &[&str] = &[
    "tx_origin_authorization",
    "unprotected_ether_withdrawal",
    "unchecked_call_return",
    "unchecked_external_call",
    "transaction_order_dependence",
    "weak_randomness",
    "dos_gas_limit",
    "dos_failed_call",
];

/// Resolves the default [`crate::finding::Severity`] for a vulnerability type
/// tag an adapter reported without its own severity: `CRITICAL` if
/// `normalized_type` matches the configured CRITICAL set, else `HIGH` if it
/// matches the HIGH set, else `MEDIUM`.
#[must_use]
pub fn default_severity_for_type(normalized_type: &str) -> crate::finding::Severity {
    use crate::finding::Severity;
    if CRITICAL_TYPES.contains(&normalized_type) {
        Severity::Critical
    } else if HIGH_TYPES.contains(&normalized_type) {
        Severity::High
    } else {
        Severity::Medium
    }
}
