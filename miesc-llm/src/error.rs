//! Error taxonomy for the LLM backend abstraction and the pipelines built on
//! top of it.

use thiserror::Error;

/// Failures an [`crate::backend::LlmBackend`] can surface from `generate`.
/// Every backend must distinguish these three rather than collapsing them
/// into a single "failed" case, so a calling adapter can decide whether to
/// retry, back off, or give up.
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The backend responded, but the response could not be used (malformed
    /// JSON, empty completion, unexpected shape).
    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    /// A backend-specific configuration problem discovered at call time
    /// (e.g. a missing API key), distinct from [`crate::config::ConfigError`]
    /// which covers build-time validation.
    #[error("backend misconfigured: {0}")]
    Misconfigured(String),
}

/// Errors raised while building or validating an [`crate::config::LlmConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unsupported config file format: {message}")]
    UnsupportedFormat { message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Ensemble voting weights did not sum to 1.0 within tolerance.
    #[error("ensemble weights must sum to 1.0 (+/- {epsilon}), got {actual}")]
    EnsembleWeightsUnbalanced { actual: f32, epsilon: f32 },
}

/// Errors raised while running a pipeline stage (generator/verifier,
/// ensemble, or dual-role) over a batch of candidates.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("backend {backend} failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: LlmError,
    },

    #[error("pipeline run was cancelled")]
    Cancelled,

    #[error("no backends configured for pipeline")]
    NoBackends,
}
