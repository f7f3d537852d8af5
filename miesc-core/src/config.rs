//! Run configuration: profile selection, per-layer concurrency and
//! per-adapter timeout budgets, and the overall run timeout. Resolved
//! eagerly and validated before any adapter runs, mirroring the
//! fail-closed, validate-at-build-time shape of a security policy builder.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::finding::{ConfidenceBand, Severity};
use crate::profile::{Profile, ProfileOverrides};

/// Fully resolved configuration for one audit run. Construct via
/// [`RunConfigBuilder`]; there is no public way to build an invalid
/// `RunConfig` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub profile: Profile,
    pub overrides: ProfileOverrides,
    /// Upper bound on concurrently running adapters within a single layer.
    pub max_workers: usize,
    /// Per-adapter wall-clock budget.
    #[serde(with = "duration_secs")]
    pub adapter_timeout: Duration,
    /// Overall wall-clock budget for the run; `None` means unbounded.
    #[serde(with = "duration_secs_opt", default)]
    pub run_timeout: Option<Duration>,
    /// When `true` (the default), an adapter whose `status()` is not
    /// `Available`/`Deprecated` is never invoked and is recorded with
    /// run-status `skipped`. When `false`, it is still "run" to produce a
    /// uniform `unavailable` result, per spec.md §4.5 step 1.
    #[serde(default = "default_true")]
    pub skip_unavailable: bool,
    /// Drop findings below this severity from the final output. `None`
    /// keeps every severity.
    #[serde(default)]
    pub min_severity: Option<Severity>,
    /// Drop findings below this confidence band from the final output.
    /// `None` keeps every band.
    #[serde(default)]
    pub min_confidence: Option<ConfidenceBand>,
}

fn default_true() -> bool {
    true
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        d.map(|d| d.as_secs_f64()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<f64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Standard,
            overrides: ProfileOverrides::default(),
            max_workers: 4,
            adapter_timeout: Duration::from_secs(120),
            run_timeout: None,
            skip_unavailable: true,
            min_severity: None,
            min_confidence: None,
        }
    }
}

/// Builder for [`RunConfig`], resolving from a compiled default, an
/// optional config file (YAML, TOML, or JSON, sniffed by extension), and
/// environment variable overrides — in that order, later wins.
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    base: RunConfig,
    use_env: bool,
}

impl RunConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: RunConfig::default(),
            use_env: false,
        }
    }

    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.base.profile = profile;
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.base.overrides = overrides;
        self
    }

    #[must_use]
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.base.max_workers = max_workers;
        self
    }

    #[must_use]
    pub fn adapter_timeout(mut self, timeout: Duration) -> Self {
        self.base.adapter_timeout = timeout;
        self
    }

    #[must_use]
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.base.run_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn skip_unavailable(mut self, skip: bool) -> Self {
        self.base.skip_unavailable = skip;
        self
    }

    #[must_use]
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.base.min_severity = Some(severity);
        self
    }

    #[must_use]
    pub fn min_confidence(mut self, band: ConfidenceBand) -> Self {
        self.base.min_confidence = Some(band);
        self
    }

    /// Loads a config file, sniffing format from its extension.
    ///
    /// # Errors
    /// Returns [`ConfigError::FileRead`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it cannot be parsed in the sniffed format,
    /// [`ConfigError::UnknownOption`] if it sets a key `RunConfig` doesn't
    /// recognize, or [`ConfigError::UnsupportedFormat`] for an unrecognized
    /// extension.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: RunConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| classify_parse_error("YAML", e))?
            }
            Some("toml") => {
                toml::from_str(&content).map_err(|e| classify_parse_error("TOML", e))?
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| classify_parse_error("JSON", e))?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    message: "config file extension must be .yaml, .yml, .toml, or .json"
                        .to_string(),
                });
            }
        };

        self.base = parsed;
        Ok(self)
    }

    /// Enables loading overrides from `MIESC_*` environment variables,
    /// consulting a `.env` file if present.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Resolves all sources into a validated [`RunConfig`].
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownProfile`], [`ConfigError::UnknownOverride`],
    /// or [`ConfigError::InvalidValue`] if the resolved configuration is
    /// invalid. Validation happens eagerly, before any adapter runs.
    pub fn build(mut self, known_adapters: &[String]) -> Result<RunConfig, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok();

            if let Ok(profile) = std::env::var("MIESC_PROFILE") {
                self.base.profile = Profile::parse(&profile)?;
            }
            if let Ok(workers) = std::env::var("MIESC_MAX_WORKERS") {
                self.base.max_workers = workers.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MIESC_MAX_WORKERS".to_string(),
                    message: "must be a positive integer".to_string(),
                })?;
            }
            if let Ok(secs) = std::env::var("MIESC_ADAPTER_TIMEOUT_SECS") {
                let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MIESC_ADAPTER_TIMEOUT_SECS".to_string(),
                    message: "must be a positive integer".to_string(),
                })?;
                self.base.adapter_timeout = Duration::from_secs(secs);
            }
        }

        crate::profile::select(self.base.profile, &self.base.overrides, known_adapters)?;

        if self.base.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(self.base)
    }
}

/// Classifies a format-specific deserialization error: `serde`'s
/// `deny_unknown_fields` rejection surfaces as a "unknown field" message
/// regardless of format, so it is pulled out into its own variant instead of
/// being reported as an opaque parse failure.
fn classify_parse_error<E: std::error::Error + Send + Sync + 'static>(
    format: &'static str,
    error: E,
) -> ConfigError {
    let message = error.to_string();
    match extract_unknown_field(&message) {
        Some(key) => ConfigError::UnknownOption { key },
        None => ConfigError::Parse {
            format,
            source: Box::new(error),
        },
    }
}

fn extract_unknown_field(message: &str) -> Option<String> {
    let marker = "unknown field `";
    let start = message.find(marker)? + marker.len();
    let field = &message[start..];
    let end = field.find('`')?;
    Some(field[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_standard_profile() {
        let config = RunConfigBuilder::new().build(&[]).unwrap();
        assert!(matches!(config.profile, Profile::Standard));
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = RunConfigBuilder::new().max_workers(0).build(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn extract_unknown_field_reads_the_offending_key() {
        let message = "unknown field `max_worker`, expected one of `profile`, `overrides`";
        assert_eq!(extract_unknown_field(message), Some("max_worker".to_string()));
    }

    #[test]
    fn unknown_field_in_config_file_is_rejected() {
        let dir = std::env::temp_dir().join(format!(
            "miesc-config-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "max_worker: 2\n").unwrap();

        let err = RunConfigBuilder::new().with_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { key } if key == "max_worker"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn unknown_adapter_override_is_rejected_before_build_succeeds() {
        let overrides = ProfileOverrides {
            include_adapters: vec!["ghost-tool".to_string()],
            ..Default::default()
        };
        let err = RunConfigBuilder::new()
            .overrides(overrides)
            .build(&["slither".to_string()])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOverride(_)));
    }
}
