//! The tool adapter protocol: the uniform contract every wrapped static
//! analyzer, linter, or heuristic scanner implements.
//!
//! Shaped like a node in a workflow graph: a small async trait with a
//! context object passed by reference, generalized so that instead of
//! producing graph state deltas, an adapter produces [`Finding`]s against a
//! contract on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::finding::Finding;
use crate::tool::{ToolMetadata, ToolStatus};

/// Options threaded through to a single `analyze` call. Adapters that don't
/// understand a given option ignore it; unknown keys are never an error at
/// this layer (that validation happens earlier, in [`crate::config`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of running a tool against one contract. `analyze` never returns
/// `Err` for a tool-level failure — it reports `status = Error` with a
/// message instead, so one misbehaving adapter can't abort an entire layer.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub duration: Duration,
    /// Raw, adapter-specific output (e.g. the tool's native JSON), handed to
    /// `normalize` unchanged. Empty on error.
    pub raw_output: serde_json::Value,
    pub error_message: Option<String>,
}

impl AnalysisResult {
    #[must_use]
    pub fn ok(duration: Duration, raw_output: serde_json::Value) -> Self {
        Self {
            status: AnalysisStatus::Ok,
            duration,
            raw_output,
            error_message: None,
        }
    }

    #[must_use]
    pub fn error(duration: Duration, error: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Error,
            duration,
            raw_output: serde_json::Value::Null,
            error_message: Some(error.into()),
        }
    }

    #[must_use]
    pub fn timed_out(duration: Duration) -> Self {
        Self {
            status: AnalysisStatus::Timeout,
            duration,
            raw_output: serde_json::Value::Null,
            error_message: Some(format!("analysis exceeded timeout of {duration:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Ok,
    Error,
    Timeout,
}

/// The uniform contract every adapter implements.
///
/// Contract:
/// - `metadata` is pure and synchronous.
/// - `status` probes availability/version and must complete within roughly
///   2 seconds; callers enforce the bound with a timeout wrapper rather than
///   trusting the implementation.
/// - `analyze` never panics or propagates a tool failure as an `Err`; it
///   always returns an `AnalysisResult`, using `AnalysisStatus::Error` to
///   report a failure.
/// - `normalize` is deterministic and synchronous: the same raw output
///   always normalizes to the same findings (modulo finding `id`, which is
///   freshly generated).
#[async_trait]
pub trait Adapter: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    async fn status(&self) -> ToolStatus;

    async fn analyze(
        &self,
        contract_path: &Path,
        options: &AnalyzeOptions,
        timeout: Duration,
    ) -> AnalysisResult;

    fn normalize(&self, raw: &serde_json::Value) -> Result<Vec<Finding>, AdapterError>;
}

/// Convenience wrapper used by the orchestrator to run `analyze` under an
/// enforced timeout even when the adapter's own internal timeout handling
/// is absent or buggy.
pub async fn analyze_with_timeout(
    adapter: &(dyn Adapter + '_),
    contract_path: &Path,
    options: &AnalyzeOptions,
    timeout: Duration,
) -> AnalysisResult {
    let started = std::time::Instant::now();
    match tokio::time::timeout(timeout, adapter.analyze(contract_path, options, timeout)).await {
        Ok(result) => result,
        Err(_elapsed) => AnalysisResult::timed_out(started.elapsed()),
    }
}

/// A contract path plus whatever adapters need to know about it beyond the
/// raw bytes (used by builtin adapters that read the file themselves).
#[derive(Debug, Clone)]
pub struct ContractTarget {
    pub path: PathBuf,
    pub source: String,
}

impl ContractTarget {
    /// Reads `path` into a [`ContractTarget`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read as UTF-8 text.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let source = std::fs::read_to_string(&path)?;
        Ok(Self { path, source })
    }
}
