//! Configuration for the LLM adapter facilities: which backend to talk to,
//! default sampling parameters, and the ensemble voting weight table.
//!
//! Resolution order mirrors `miesc-core`'s `RunConfigBuilder`: compiled
//! defaults, then a caller-supplied config file, then environment
//! variables, validated eagerly so a misconfiguration surfaces before any
//! backend is called rather than mid-run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ConfigError;

/// Backend name → vote weight. Validated at construction time to sum to
/// 1.0 within [`EnsembleWeights::EPSILON`].
///
/// Resolves the open question of how ensemble votes should be weighted by
/// defaulting to an equal split across whichever backends are configured,
/// while still letting an operator supply an explicit table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights(Vec<(String, f32)>);

impl EnsembleWeights {
    pub const EPSILON: f32 = 1e-3;

    /// An equal-weight split across `backend_names`, each entry weighted
    /// `1.0 / n`. Empty input yields an empty (always-unbalanced-if-used)
    /// table; callers pair this with at least one configured backend.
    #[must_use]
    pub fn equal_split(backend_names: &[impl AsRef<str>]) -> Self {
        if backend_names.is_empty() {
            return Self(Vec::new());
        }
        #[allow(clippy::cast_precision_loss)]
        let weight = 1.0 / backend_names.len() as f32;
        Self(
            backend_names
                .iter()
                .map(|name| (name.as_ref().to_string(), weight))
                .collect(),
        )
    }

    /// An explicit weight table, validated to sum to 1.0 within
    /// [`EnsembleWeights::EPSILON`].
    pub fn new(weights: Vec<(String, f32)>) -> Result<Self, ConfigError> {
        let table = Self(weights);
        table.validate_sums_to_one()?;
        Ok(table)
    }

    fn validate_sums_to_one(&self) -> Result<(), ConfigError> {
        let total: f32 = self.0.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > Self::EPSILON {
            return Err(ConfigError::EnsembleWeightsUnbalanced {
                actual: total,
                epsilon: Self::EPSILON,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn weight_of(&self, backend_name: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|(name, _)| name == backend_name)
            .map(|(_, w)| *w)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(name, w)| (name.as_str(), *w))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which built-in backend kind `llm.backend` selects, before any
/// vendor-specific endpoint/model detail is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// The deterministic, network-free backend. The safe default: it never
    /// makes an outbound request.
    Local,
    /// An OpenAI-compatible `/chat/completions` endpoint.
    OpenAiCompatible,
    /// An Anthropic-shaped `/v1/messages` endpoint.
    Anthropic,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Local
    }
}

/// Configuration for the LLM adapter facilities.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LlmConfig {
    pub backend: BackendKind,
    pub model: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,
    pub max_tokens: u32,
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub ensemble_weights: EnsembleWeights,
    pub per_backend_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: "local".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            endpoint: None,
            api_key: None,
            ensemble_weights: EnsembleWeights::equal_split(&["local"]),
            per_backend_timeout_seconds: 30,
        }
    }
}

/// Builds an [`LlmConfig`] from compiled defaults, an optional config file,
/// and environment variables, in that order (later sources win), matching
/// `miesc-core`'s `RunConfigBuilder` resolution order.
#[derive(Debug, Default)]
pub struct LlmConfigBuilder {
    base: LlmConfig,
    use_env: bool,
}

impl LlmConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: LlmConfig::default(),
            use_env: false,
        }
    }

    /// Merges fields from a JSON, YAML, or TOML file (detected by
    /// extension) on top of the current state.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
            path: path.clone(),
            source,
        })?;

        let overrides: PartialLlmConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "json",
                source: Box::new(e),
            })?,
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                    format: "yaml",
                    source: Box::new(e),
                })?
            }
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "toml",
                source: Box::new(e),
            })?,
            other => {
                return Err(ConfigError::UnsupportedFormat {
                    message: format!("unrecognized config extension: {other:?}"),
                });
            }
        };

        overrides.apply_to(&mut self.base);
        Ok(self)
    }

    /// Reads `MIESC_LLM_*` environment variables on top of the current
    /// state; `.env` files are loaded first via `dotenvy` if present.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    pub fn build(mut self) -> Result<LlmConfig, ConfigError> {
        if self.use_env {
            let _ = dotenvy::dotenv();
            if let Ok(model) = std::env::var("MIESC_LLM_MODEL") {
                self.base.model = model;
            }
            if let Ok(endpoint) = std::env::var("MIESC_LLM_ENDPOINT") {
                self.base.endpoint = Some(endpoint);
            }
            if let Ok(key) = std::env::var("MIESC_LLM_API_KEY") {
                self.base.api_key = Some(key);
            }
            if let Ok(temp) = std::env::var("MIESC_LLM_TEMPERATURE") {
                self.base.temperature = temp.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MIESC_LLM_TEMPERATURE".to_string(),
                    message: format!("{temp:?} is not a valid float"),
                })?;
            }
        }

        self.base
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "llm".to_string(),
                message: e.to_string(),
            })?;
        self.base.ensemble_weights.validate_sums_to_one()?;

        Ok(self.base)
    }
}

/// A sparse, all-optional mirror of [`LlmConfig`] used to apply a config
/// file's fields on top of the running defaults without requiring every
/// field to be present.
#[derive(Debug, Default, Deserialize)]
struct PartialLlmConfig {
    backend: Option<BackendKind>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    endpoint: Option<String>,
    ensemble_weights: Option<HashMap<String, f32>>,
    per_backend_timeout_seconds: Option<u64>,
}

impl PartialLlmConfig {
    fn apply_to(self, base: &mut LlmConfig) {
        if let Some(backend) = self.backend {
            base.backend = backend;
        }
        if let Some(model) = self.model {
            base.model = model;
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            base.max_tokens = max_tokens;
        }
        if let Some(endpoint) = self.endpoint {
            base.endpoint = Some(endpoint);
        }
        if let Some(weights) = self.ensemble_weights {
            base.ensemble_weights = EnsembleWeights(weights.into_iter().collect());
        }
        if let Some(timeout) = self.per_backend_timeout_seconds {
            base.per_backend_timeout_seconds = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_split_sums_to_one() {
        let weights = EnsembleWeights::equal_split(&["a", "b", "c"]);
        let total: f32 = weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < EnsembleWeights::EPSILON);
    }

    #[test]
    fn unbalanced_weights_are_rejected() {
        let result = EnsembleWeights::new(vec![("a".to_string(), 0.2), ("b".to_string(), 0.2)]);
        assert!(matches!(
            result,
            Err(ConfigError::EnsembleWeightsUnbalanced { .. })
        ));
    }

    #[test]
    fn default_config_validates() {
        let config = LlmConfigBuilder::new().build().unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert!(config.ensemble_weights.weight_of("local").is_some());
    }

    #[test]
    fn out_of_range_temperature_fails_validation() {
        let mut config = LlmConfig::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_override_merges_onto_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.toml");
        std::fs::write(&path, "model = \"gpt-4o-mini\"\ntemperature = 0.1\n").unwrap();

        let config = LlmConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
        // backend left at its default since the file didn't mention it
        assert_eq!(config.backend, BackendKind::Local);
    }
}
