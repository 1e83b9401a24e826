//! Reaper Configuration
//!
//! Startup settings are frozen once in [`ReaperSettings`]. Everything a single
//! cleanup pass needs is captured in an immutable [`CycleConfig`] built at the
//! start of every cycle, which is where the hot-reloaded name pattern gets
//! recompiled.

use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Environment variable naming the expiry annotation key
pub const ANNOTATION_KEY_ENV: &str = "KUBE_ANNOTATION_KEY";

/// Environment variable holding the optional namespace allow-pattern (re-read every cycle)
pub const NAMESPACES_REGEX_ENV: &str = "NAMESPACES_REGEX";

/// Namespaces that are never deleted, whatever their annotations say
pub const PROTECTED_NAMESPACES: &[&str] = &["default", "kube-system", "flux-system"];

/// Errors raised while assembling a cycle configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {NAMESPACES_REGEX_ENV} pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Settings captured once at process startup
#[derive(Debug, Clone)]
pub struct ReaperSettings {
    /// Annotation carrying the expiry timestamp. Empty means no namespace has an opinion.
    pub annotation_key: String,

    /// Names exempt from cleanup
    pub protected_names: BTreeSet<String>,

    /// Log expired namespaces instead of deleting them
    pub dry_run: bool,
}

impl ReaperSettings {
    /// Settings with the built-in protected namespace list.
    #[must_use]
    pub fn new(annotation_key: impl Into<String>, dry_run: bool) -> Self {
        Self {
            annotation_key: annotation_key.into(),
            protected_names: PROTECTED_NAMESPACES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            dry_run,
        }
    }

    /// Returns `true` when an annotation key is configured.
    pub fn has_annotation_key(&self) -> bool {
        !self.annotation_key.is_empty()
    }
}

/// Immutable configuration for one cleanup cycle
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub annotation_key: String,
    pub protected_names: BTreeSet<String>,
    pub name_pattern: Option<Regex>,
    pub dry_run: bool,
    /// Unix seconds captured once; every expiry in the cycle is judged against it
    pub reference_time: i64,
}

impl CycleConfig {
    /// Build the configuration for a cycle starting at `reference_time`.
    ///
    /// An unset or empty `raw_pattern` disables pattern filtering. A pattern
    /// that does not compile aborts the cycle before anything is processed.
    pub fn build(
        settings: &ReaperSettings,
        raw_pattern: Option<&str>,
        reference_time: i64,
    ) -> Result<Self, ConfigError> {
        let name_pattern = match raw_pattern.filter(|p| !p.is_empty()) {
            Some(pattern) => {
                Some(
                    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })?,
                )
            }
            None => None,
        };

        Ok(Self {
            annotation_key: settings.annotation_key.clone(),
            protected_names: settings.protected_names.clone(),
            name_pattern,
            dry_run: settings.dry_run,
            reference_time,
        })
    }
}

/// Where the per-cycle name pattern comes from
pub trait PatternSource: Send + Sync {
    /// Current raw pattern, if any.
    fn current(&self) -> Option<String>;
}

/// Reads [`NAMESPACES_REGEX_ENV`] from the process environment on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvPatternSource;

impl PatternSource for EnvPatternSource {
    fn current(&self) -> Option<String> {
        std::env::var(NAMESPACES_REGEX_ENV).ok()
    }
}

/// Fixed pattern, mostly useful in tests
#[derive(Debug, Clone, Default)]
pub struct StaticPatternSource(pub Option<String>);

impl PatternSource for StaticPatternSource {
    fn current(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_settings_carry_builtin_protected_names() {
        let settings = ReaperSettings::new("expires-at", false);
        for name in PROTECTED_NAMESPACES {
            assert!(settings.protected_names.contains(*name));
        }
        assert_eq!(settings.protected_names.len(), 3);
        assert!(settings.has_annotation_key());
        assert!(!ReaperSettings::new("", false).has_annotation_key());
    }

    #[test]
    fn test_build_without_pattern() {
        let settings = ReaperSettings::new("expires-at", true);
        let config = CycleConfig::build(&settings, None, 1_700_000_000).unwrap();
        assert!(config.name_pattern.is_none());
        assert!(config.dry_run);
        assert_eq!(config.reference_time, 1_700_000_000);
        assert_eq!(config.annotation_key, "expires-at");
    }

    #[test]
    fn test_empty_pattern_means_no_pattern() {
        let settings = ReaperSettings::new("expires-at", false);
        let config = CycleConfig::build(&settings, Some(""), 0).unwrap();
        assert!(config.name_pattern.is_none());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let settings = ReaperSettings::new("expires-at", false);
        let err = CycleConfig::build(&settings, Some("test-("), 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "test-("));
        assert!(err.to_string().contains(NAMESPACES_REGEX_ENV));
    }

    #[test]
    #[serial]
    fn test_env_pattern_source_rereads_environment() {
        let source = EnvPatternSource;

        // SAFETY: This test runs serially via #[serial] to avoid env var races
        unsafe {
            std::env::set_var(NAMESPACES_REGEX_ENV, "test-.*");
        }
        assert_eq!(source.current().as_deref(), Some("test-.*"));

        unsafe {
            std::env::set_var(NAMESPACES_REGEX_ENV, "preview-.*");
        }
        assert_eq!(source.current().as_deref(), Some("preview-.*"));

        unsafe {
            std::env::remove_var(NAMESPACES_REGEX_ENV);
        }
        assert_eq!(source.current(), None);
    }
}
