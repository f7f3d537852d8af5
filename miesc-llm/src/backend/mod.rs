//! The narrow interface every model integration implements.
//!
//! A backend's only job is to turn a prompt into text within a timeout,
//! surfacing rate limiting, timeouts, and connection failures as distinct
//! [`crate::error::LlmError`] variants so callers can decide whether to
//! retry, back off, or give up rather than treating every failure alike.

mod http;
mod local;

pub use http::{HttpBackend, HttpRequestBuilder, HttpResponseParser};
pub use local::LocalBackend;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;

/// Sampling and decoding parameters passed to a backend on every call.
///
/// Mirrors the options contract every backend must accept: temperature,
/// a max token budget, stop sequences, and an optional seed for
/// reproducible sampling where the backend supports it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub seed: Option<u64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            stop: Vec::new(),
            seed: None,
        }
    }
}

/// A model backend capable of completing a prompt.
///
/// Implementations must not block past `timeout`; callers rely on the
/// backend itself racing its request against the deadline rather than
/// wrapping every call in an external `tokio::time::timeout`, since only
/// the backend knows how to cancel its own in-flight request cleanly.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short identifier used in logs, ensemble vote tallies, and error
    /// messages (e.g. `"local"`, `"gpt-4o"`, `"claude-sonnet"`).
    fn name(&self) -> &str;

    /// Completes `prompt` under `options`, bounded by `timeout`.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        timeout: Duration,
    ) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generate_options_are_conservative() {
        let options = GenerateOptions::default();
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, 1024);
        assert!(options.stop.is_empty());
        assert_eq!(options.seed, None);
    }
}
