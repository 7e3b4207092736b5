//! Field-name classifiers for sensitive property detection

use crate::config::SensitiveConfig;
use crate::error::{Error, Result};
use regex::Regex;

/// Decides whether a property name suggests secret material.
///
/// Only the property name is inspected, never its type or value. Any
/// `Fn(&str) -> bool` closure implements this trait, so callers can inject
/// synthetic classifiers.
pub trait FieldClassifier: Send + Sync {
    /// Whether `name` is a sensitive property name
    fn is_sensitive(&self, name: &str) -> bool;
}

impl<F> FieldClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_sensitive(&self, name: &str) -> bool {
        self(name)
    }
}

/// Regex-based classifier over a configurable pattern list
pub struct PatternClassifier {
    patterns: Vec<Regex>,
}

impl PatternClassifier {
    /// Compile the given patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::Config(format!("Invalid sensitive pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Build from the `[sensitive]` configuration section
    pub fn from_config(config: &SensitiveConfig) -> Result<Self> {
        Self::new(&config.patterns)
    }

    /// Number of loaded patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is loaded
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl FieldClassifier for PatternClassifier {
    fn is_sensitive(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_classifier() -> PatternClassifier {
        PatternClassifier::from_config(&SensitiveConfig::default()).unwrap()
    }

    #[test]
    fn test_default_patterns_match() {
        let classifier = default_classifier();
        for name in [
            "password",
            "adminPassword",
            "passwd",
            "token",
            "bearerToken",
            "clientSecret",
            "secretRef",
            "credentials",
            "caCertificate",
            "tlsCert",
            "apiKey",
            "private_key",
            "privateKey",
            "key",
            "kubeconfig",
        ] {
            assert!(classifier.is_sensitive(name), "{} should be sensitive", name);
        }
    }

    #[test]
    fn test_default_patterns_ignore() {
        let classifier = default_classifier();
        for name in ["metadata", "spec", "replicas", "image", "labels", "keys", "monkey"] {
            assert!(!classifier.is_sensitive(name), "{} should not be sensitive", name);
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let result = PatternClassifier::new(&["(unclosed".to_string()]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |name: &str| name == "pin";
        assert!(classifier.is_sensitive("pin"));
        assert!(!classifier.is_sensitive("password"));
    }

    #[test]
    fn test_len() {
        let classifier = PatternClassifier::new(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(classifier.len(), 2);
        assert!(!classifier.is_empty());
    }
}
