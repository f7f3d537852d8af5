//! Tool metadata and runtime status, independent of any particular adapter
//! implementation. Every adapter is optional: the orchestrator must be able
//! to run a full audit with every tool reporting [`ToolStatus::NotInstalled`].

use serde::{Deserialize, Serialize};

/// The broad technique family a tool belongs to, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Static,
    Dynamic,
    Symbolic,
    Formal,
    Ai,
    Ml,
    Economic,
    Dependency,
    Specialized,
}

/// Static identity of a tool, independent of whether it is currently usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub version: String,
    pub vendor: Option<String>,
    pub homepage: Option<String>,
    /// The layer this adapter runs in by default (1-9). Profiles select a
    /// contiguous prefix of layers; this is what makes that selection
    /// meaningful for a given adapter.
    pub default_layer: u8,
    pub category: ToolCategory,
    /// Free-form vulnerability-kind tags this tool is capable of detecting,
    /// used by registry lookups that filter adapters by capability rather
    /// than by layer alone.
    pub detection_types: Vec<String>,
    /// Always `true` in this system (see spec.md §9's DPGA-style optionality
    /// constraint): no code path may assume a specific adapter is present.
    pub is_optional: bool,
    pub license: String,
    pub default_timeout_seconds: u64,
    pub requires_external_binary: bool,
    pub requires_network: bool,
    pub description: String,
}

/// The outcome of probing whether a tool can actually run right now.
///
/// Probing ([`crate::adapter::Adapter::status`]) must complete within 2
/// seconds; it is a cheap existence/version check, not a full analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolStatus {
    Available,
    NotInstalled,
    Misconfigured,
    UnavailableRuntime,
    Deprecated,
}

impl ToolStatus {
    #[must_use]
    pub fn is_runnable(self) -> bool {
        matches!(self, ToolStatus::Available | ToolStatus::Deprecated)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolStatus::Available => "available",
            ToolStatus::NotInstalled => "not_installed",
            ToolStatus::Misconfigured => "misconfigured",
            ToolStatus::UnavailableRuntime => "unavailable_runtime",
            ToolStatus::Deprecated => "deprecated",
        };
        f.write_str(s)
    }
}

/// A [`ToolStatus`] plus the free-form reason and install hint spec.md §4.2
/// requires every status carry, and the outcome of actually invoking the
/// adapter during this run (if it was invoked at all). This is the record
/// that ends up in [`crate::orchestrator::RunResult::tool_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatusReport {
    pub tool: String,
    pub status: ToolStatus,
    pub reason: Option<String>,
    pub install_hint: Option<String>,
    pub run_status: RunStatus,
}

/// The terminal state of one adapter invocation within a run, independent of
/// its static [`ToolStatus`]. Mirrors spec.md §4.5's adapter state machine:
/// `pending -> running -> {success | error | timeout | unavailable | skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
    Timeout,
    Unavailable,
    Skipped,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::Error => "error",
            RunStatus::Timeout => "timeout",
            RunStatus::Unavailable => "unavailable",
            RunStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deprecated_tools_are_still_runnable() {
        assert!(ToolStatus::Deprecated.is_runnable());
        assert!(ToolStatus::Available.is_runnable());
        assert!(!ToolStatus::NotInstalled.is_runnable());
        assert!(!ToolStatus::Misconfigured.is_runnable());
        assert!(!ToolStatus::UnavailableRuntime.is_runnable());
    }
}
