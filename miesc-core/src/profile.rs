//! Profile selection: a pure function mapping a profile name plus
//! adapter-allowlist overrides to the set of layers to run and the adapters
//! permitted within them. Rejects unknown overrides eagerly, before any
//! adapter is invoked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Named depth presets. Each selects a contiguous prefix of the nine fixed
/// layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Quick,
    Standard,
    Thorough,
    Paranoid,
}

impl Profile {
    #[must_use]
    pub fn max_layer(self) -> u8 {
        match self {
            Profile::Quick => 1,
            Profile::Standard => 3,
            Profile::Thorough => 6,
            Profile::Paranoid => 9,
        }
    }

    #[must_use]
    pub fn layers(self) -> BTreeSet<u8> {
        (1..=self.max_layer()).collect()
    }

    /// Parses a profile name case-insensitively.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownProfile`] for any name other than
    /// `quick`, `standard`, `thorough`, or `paranoid`.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "quick" => Ok(Profile::Quick),
            "standard" => Ok(Profile::Standard),
            "thorough" => Ok(Profile::Thorough),
            "paranoid" => Ok(Profile::Paranoid),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

/// Caller-supplied overrides to a profile's default layer set and adapter
/// allowlist. Every key is validated against `known_adapters` before the
/// selector returns, so a typo in an override surfaces as a
/// [`ConfigError`] instead of silently running (or silently skipping) the
/// wrong tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    /// Adapter names to force-enable even if their default layer falls
    /// outside the profile's layer range.
    #[serde(default)]
    pub include_adapters: Vec<String>,
    /// Adapter names to exclude even if their default layer is in range.
    #[serde(default)]
    pub exclude_adapters: Vec<String>,
    /// Override the maximum layer directly, bypassing the named profile's
    /// default depth.
    #[serde(default)]
    pub max_layer: Option<u8>,
}

/// Resolved selection: which layers run, and which adapters (by name) are
/// allowed to run within them.
#[derive(Debug, Clone)]
pub struct Selection {
    pub layers: BTreeSet<u8>,
    pub allowlist: BTreeSet<String>,
    pub denylist: BTreeSet<String>,
}

/// Resolves `(profile, overrides)` against the adapters known to the
/// registry into a concrete [`Selection`].
///
/// Pure and side-effect free: the same inputs always produce the same
/// output, and no adapter is touched in the process.
///
/// # Errors
/// Returns [`ConfigError::UnknownOverride`] if `overrides` names an adapter
/// not present in `known_adapters`.
pub fn select(
    profile: Profile,
    overrides: &ProfileOverrides,
    known_adapters: &[String],
) -> Result<Selection, ConfigError> {
    for name in overrides
        .include_adapters
        .iter()
        .chain(overrides.exclude_adapters.iter())
    {
        if !known_adapters.iter().any(|a| a == name) {
            return Err(ConfigError::UnknownOverride(name.clone()));
        }
    }

    let max_layer = overrides.max_layer.unwrap_or_else(|| profile.max_layer());
    let layers: BTreeSet<u8> = (1..=max_layer).collect();
    let allowlist: BTreeSet<String> = overrides.include_adapters.iter().cloned().collect();
    let denylist: BTreeSet<String> = overrides.exclude_adapters.iter().cloned().collect();

    Ok(Selection {
        layers,
        allowlist,
        denylist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_profile_is_layer_one_only() {
        assert_eq!(Profile::Quick.max_layer(), 1);
        assert_eq!(Profile::Quick.layers(), BTreeSet::from([1]));
    }

    #[test]
    fn paranoid_profile_covers_all_nine_layers() {
        assert_eq!(Profile::Paranoid.layers(), (1..=9).collect());
    }

    #[test]
    fn unknown_profile_name_is_rejected() {
        assert!(Profile::parse("ludicrous").is_err());
    }

    #[test]
    fn unknown_override_adapter_is_rejected_before_any_adapter_runs() {
        let overrides = ProfileOverrides {
            exclude_adapters: vec!["not-a-real-tool".to_string()],
            ..Default::default()
        };
        let known = vec!["slither".to_string()];
        let err = select(Profile::Standard, &overrides, &known).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOverride(_)));
    }

    #[test]
    fn max_layer_override_bypasses_profile_default() {
        let overrides = ProfileOverrides {
            max_layer: Some(9),
            ..Default::default()
        };
        let selection = select(Profile::Quick, &overrides, &[]).unwrap();
        assert_eq!(selection.layers, (1..=9).collect());
    }
}
