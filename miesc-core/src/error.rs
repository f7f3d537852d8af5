//! Error taxonomy for the tool adapter plane and orchestrator.
//!
//! Every fallible operation in `miesc-core` returns one of the variants below
//! rather than panicking. [`RunError::Configuration`] is special: it must be
//! raised, if at all, before any adapter has been invoked for a run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced while preparing or driving a single audit run.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum RunError {
    /// Raised before any adapter runs: unknown profile name, unknown override
    /// key, or a value that fails validation. Aborts the run outright.
    #[error("configuration error: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::run::configuration)))]
    Configuration(#[from] ConfigError),

    /// A named adapter could not be resolved against the registry.
    #[error("unknown adapter: {0}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(miesc::run::unknown_adapter), help("Check the adapter name against the registry."))
    )]
    UnknownAdapter(String),

    /// The run's overall wall-clock budget elapsed before all layers
    /// completed. No partial aggregation is emitted for a run in this state.
    #[error("run exceeded its timeout of {0:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::run::timeout)))]
    RunTimeout(std::time::Duration),

    /// The run was cancelled cooperatively (e.g. caller dropped the handle
    /// or requested cancellation). No partial aggregation is emitted.
    #[error("run was cancelled")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::run::cancelled)))]
    RunCancelled,

    /// The contract path could not be read.
    #[error("failed to read contract at {path}: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::run::contract_read)))]
    ContractRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building a [`crate::config::RunConfig`].
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum ConfigError {
    #[error("unknown profile: {0}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(miesc::config::unknown_profile), help("Valid profiles: quick, standard, thorough, paranoid."))
    )]
    UnknownProfile(String),

    #[error("unknown adapter override: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::config::unknown_override)))]
    UnknownOverride(String),

    #[error("failed to read config file at {path}: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::config::file_read)))]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::config::parse)))]
    Parse {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unsupported config file format: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::config::unsupported_format)))]
    UnsupportedFormat { message: String },

    /// A config file set a key `RunConfig` doesn't recognize, most often a
    /// typo'd field name. Rejected eagerly rather than silently ignored, so
    /// a mistyped key doesn't silently fall back to its default.
    #[error("unknown configuration option: {key}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(miesc::config::unknown_option), help("Check the key against RunConfig's fields."))
    )]
    UnknownOption { key: String },

    #[error("invalid value for {key}: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(miesc::config::invalid_value)))]
    InvalidValue { key: String, message: String },
}

/// Errors a [`crate::adapter::Adapter`] implementation can surface from
/// `status()` or `analyze()`. Adapters never panic or unwind across this
/// boundary; a failure is always a value.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("tool not installed: {0}")]
    NotInstalled(String),

    #[error("tool misconfigured: {0}")]
    Misconfigured(String),

    #[error("required runtime unavailable: {0}")]
    UnavailableRuntime(String),

    #[error("adapter execution failed: {0}")]
    ExecutionFailed(String),

    #[error("adapter timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("adapter produced output that could not be normalized: {0}")]
    NormalizationFailed(String),
}

/// Errors raised while aggregating raw findings.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("finding from {adapter} rejected: {reason}")]
    MalformedFinding { adapter: String, reason: String },
}

/// Errors raised by the RAG enrichment boundary, as observed by `miesc-core`
/// consumers. `miesc-rag` has its own richer error type; this is the subset
/// that crosses into orchestration decisions (degraded mode bookkeeping).
#[derive(Debug, Error)]
pub enum RagError {
    #[error("RAG subsystem is running in degraded mode: {0}")]
    Degraded(String),
}

/// A structured record of a non-fatal error observed during a run, suitable
/// for emission onto the context bus and for end-of-run reporting. Mirrors
/// the "quarantine, don't crash" handling required for malformed findings
/// and degraded subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub when: DateTime<Utc>,
    pub scope: ErrorScope,
    pub message: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Where in the pipeline an [`ErrorRecord`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Adapter,
    Orchestrator,
    Aggregator,
    Rag,
    Llm,
}

impl ErrorRecord {
    pub fn new(scope: ErrorScope, message: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            scope,
            message: message.into(),
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}
