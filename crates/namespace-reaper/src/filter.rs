//! Exemption checks run before any expiry is looked at.

use crate::config::CycleConfig;
use serde::Serialize;
use std::fmt;

/// Why a namespace was left out of expiry evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Exemption {
    /// Name is in the protected set
    Protected,
    /// A name pattern is configured and the name does not match it
    PatternMismatch,
}

impl fmt::Display for Exemption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exemption::Protected => write!(f, "protected"),
            Exemption::PatternMismatch => write!(f, "pattern-mismatch"),
        }
    }
}

/// Returns the exemption that applies to `name`, or `None` when the namespace is eligible.
///
/// Protection wins over the pattern: a protected name that also matches the
/// pattern is still reported as [`Exemption::Protected`].
pub fn exemption(name: &str, config: &CycleConfig) -> Option<Exemption> {
    if config.protected_names.contains(name) {
        return Some(Exemption::Protected);
    }

    match &config.name_pattern {
        Some(pattern) if !pattern.is_match(name) => Some(Exemption::PatternMismatch),
        _ => None,
    }
}

/// Convenience wrapper over [`exemption`].
pub fn is_exempt(name: &str, config: &CycleConfig) -> bool {
    exemption(name, config).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaperSettings;

    fn config_with_pattern(pattern: Option<&str>) -> CycleConfig {
        CycleConfig::build(&ReaperSettings::new("expires-at", false), pattern, 0).unwrap()
    }

    #[test]
    fn test_protected_names_are_exempt() {
        let config = config_with_pattern(None);
        assert_eq!(exemption("default", &config), Some(Exemption::Protected));
        assert_eq!(exemption("kube-system", &config), Some(Exemption::Protected));
        assert_eq!(exemption("flux-system", &config), Some(Exemption::Protected));
        assert_eq!(exemption("kube-public", &config), None);
    }

    #[test]
    fn test_protection_overrides_matching_pattern() {
        let config = config_with_pattern(Some(".*"));
        assert_eq!(exemption("kube-system", &config), Some(Exemption::Protected));
    }

    #[test]
    fn test_pattern_mismatch() {
        let config = config_with_pattern(Some("test-.*"));
        assert_eq!(
            exemption("other-namespace", &config),
            Some(Exemption::PatternMismatch)
        );
        assert_eq!(exemption("test-namespace", &config), None);
        assert!(is_exempt("other-namespace", &config));
        assert!(!is_exempt("test-namespace", &config));
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let config = config_with_pattern(Some("test-.*"));
        assert_eq!(exemption("my-test-env", &config), None);

        let anchored = config_with_pattern(Some("^test-"));
        assert_eq!(
            exemption("my-test-env", &anchored),
            Some(Exemption::PatternMismatch)
        );
    }

    #[test]
    fn test_exemption_display() {
        assert_eq!(Exemption::Protected.to_string(), "protected");
        assert_eq!(Exemption::PatternMismatch.to_string(), "pattern-mismatch");
    }
}
