//! kubeapi-inspector configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main kubeapi-inspector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Cluster connection configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Scan behavior configuration
    #[serde(default)]
    pub scan: ScanConfig,

    /// Sensitive field classification configuration
    #[serde(default)]
    pub sensitive: SensitiveConfig,
}

impl InspectorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Cluster connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Path to a kubeconfig (None = in-cluster credentials)
    pub kubeconfig: Option<PathBuf>,

    /// API server address, overrides kubeconfig / in-cluster host
    pub server: Option<String>,

    /// Bearer token, overrides kubeconfig / in-cluster token
    pub token: Option<String>,

    /// Namespace used for namespaced body schema lookup
    pub namespace: Option<String>,

    /// Skip TLS certificate verification
    pub insecure_skip_tls_verify: bool,

    /// Per-request timeout in seconds (watch requests add their own window)
    pub request_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            server: None,
            token: None,
            namespace: None,
            insecure_skip_tls_verify: false,
            request_timeout_secs: 30,
        }
    }
}

/// Scan behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum number of resources probed at once
    pub concurrency: usize,

    /// Watch window in seconds
    pub watch_timeout_secs: u64,

    /// Skip sensitive field detection entirely
    pub skip_sensitive_fields: bool,

    /// API groups that are never probed
    pub skip_groups: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            watch_timeout_secs: 2,
            skip_sensitive_fields: false,
            skip_groups: default_native_groups(),
        }
    }
}

/// Sensitive field classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitiveConfig {
    /// Regex patterns matched against property names
    pub patterns: Vec<String>,
}

impl Default for SensitiveConfig {
    fn default() -> Self {
        Self {
            patterns: default_sensitive_patterns(),
        }
    }
}

/// Property-name patterns that suggest secret material
pub fn default_sensitive_patterns() -> Vec<String> {
    [
        r"(?i)passw(or)?d",
        r"(?i)passphrase",
        r"(?i)token",
        r"(?i)secret",
        r"(?i)credential",
        r"(?i)cert(ificate)?",
        r"(?i)^(api|access|private|secret|signing|encryption|ssh)_?key$",
        r"(?i)^key(data)?$",
        r"(?i)private",
        r"(?i)kubeconfig",
        r"(?i)^auth$",
        r"(?i)bearer",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Built-in Kubernetes API groups; only custom APIs are probed
pub fn default_native_groups() -> Vec<String> {
    [
        "apps",
        "batch",
        "policy",
        "extensions",
        "autoscaling",
        "node.k8s.io",
        "events.k8s.io",
        "storage.k8s.io",
        "cli.k8s.io",
        "discovery.k8s.io",
        "scheduling.k8s.io",
        "networking.k8s.io",
        "coordination.k8s.io",
        "certificates.k8s.io",
        "apiextensions.k8s.io",
        "authorization.k8s.io",
        "authentication.k8s.io",
        "apiregistration.k8s.io",
        "rbac.authorization.k8s.io",
        "admissionregistration.k8s.io",
    ]
    .iter()
    .map(|g| g.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = InspectorConfig::default();
        assert_eq!(config.scan.concurrency, 4);
        assert_eq!(config.scan.watch_timeout_secs, 2);
        assert!(!config.scan.skip_sensitive_fields);
        assert!(!config.cluster.insecure_skip_tls_verify);
        assert!(config.sensitive.patterns.len() > 5);
    }

    #[test]
    fn test_native_groups() {
        let groups = default_native_groups();
        assert!(groups.iter().any(|g| g == "rbac.authorization.k8s.io"));
        assert!(!groups.iter().any(|g| g.is_empty()));
    }

    #[test]
    fn test_partial_toml() {
        let config: InspectorConfig = toml::from_str(
            r#"
            [scan]
            concurrency = 8
            watch_timeout_secs = 5
            skip_sensitive_fields = true
            skip_groups = []
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.concurrency, 8);
        assert!(config.scan.skip_groups.is_empty());
        assert_eq!(config.cluster.request_timeout_secs, 30);
        assert!(!config.sensitive.patterns.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[cluster]\nserver = \"https://10.0.0.1:6443\"\ninsecure_skip_tls_verify = true\nrequest_timeout_secs = 10\n\n[sensitive]\npatterns = [\"(?i)pin\"]"
        )
        .unwrap();

        let config = InspectorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster.server.as_deref(), Some("https://10.0.0.1:6443"));
        assert!(config.cluster.insecure_skip_tls_verify);
        assert_eq!(config.sensitive.patterns, vec!["(?i)pin".to_string()]);
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scan\nconcurrency = ").unwrap();
        let err = InspectorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = InspectorConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: InspectorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scan.skip_groups, config.scan.skip_groups);
    }
}
