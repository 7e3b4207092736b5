//! API server credential resolution
//!
//! Sources, in order: a kubeconfig file when one is given, an explicit
//! `--server`, otherwise the pod's service account. Explicit server and token
//! values always override what the source provided.

use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use kube::config::{AuthInfo, KubeConfigOptions, Kubeconfig};
use std::path::{Path, PathBuf};

/// Namespace used when nothing else names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Where the credentials came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Pod service account
    InCluster,
    /// Kubeconfig file
    Kubeconfig(PathBuf),
    /// `--server` / `--token`
    Explicit,
}

/// How requests authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer token, inline or from a file
    Token,
    /// Exec credential plugin (`aws`, `gke-gcloud-auth-plugin`, ...)
    Exec,
    /// Legacy auth provider
    AuthProvider,
    /// Client certificate
    ClientCertificate,
    /// Basic auth
    Basic,
    /// No credentials at all
    Anonymous,
}

/// A client configuration plus the namespace used for schema lookups
#[derive(Clone)]
pub struct Credentials {
    /// Client configuration
    pub config: kube::Config,
    /// Namespace for namespaced lookups
    pub namespace: String,
    /// Origin of these credentials
    pub source: CredentialSource,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.config.cluster_url)
            .field("auth", &self.auth_method())
            .field("ca", &self.config.root_cert.is_some())
            .field("insecure", &self.config.accept_invalid_certs)
            .field("namespace", &self.namespace)
            .field("source", &self.source)
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials for `cluster`
    pub async fn resolve(cluster: &ClusterConfig) -> Result<Self> {
        let (mut config, source) = if let Some(path) = &cluster.kubeconfig {
            (from_kubeconfig(path).await?, CredentialSource::Kubeconfig(path.clone()))
        } else if let Some(server) = &cluster.server {
            (kube::Config::new(parse_server(server)?), CredentialSource::Explicit)
        } else {
            let config = kube::Config::incluster().map_err(|e| {
                Error::Connection(format!(
                    "not running in a cluster and no kubeconfig given: {}",
                    e
                ))
            })?;
            (config, CredentialSource::InCluster)
        };

        if let Some(server) = &cluster.server {
            config.cluster_url = parse_server(server)?;
        }
        if let Some(token) = &cluster.token {
            config.auth_info = AuthInfo {
                token: Some(token.clone().into()),
                ..Default::default()
            };
        }
        if cluster.insecure_skip_tls_verify {
            config.accept_invalid_certs = true;
        }

        let namespace = cluster
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .or_else(|| Some(config.default_namespace.clone()).filter(|ns| !ns.is_empty()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let creds = Self {
            config,
            namespace,
            source,
        };
        if creds.auth_method() == AuthMethod::Anonymous {
            tracing::warn!(
                "No credentials found for {}, requests are anonymous",
                creds.config.cluster_url
            );
        }
        Ok(creds)
    }

    /// Authentication the client will use
    pub fn auth_method(&self) -> AuthMethod {
        let auth = &self.config.auth_info;
        if auth.token.is_some() || auth.token_file.is_some() {
            AuthMethod::Token
        } else if auth.exec.is_some() {
            AuthMethod::Exec
        } else if auth.auth_provider.is_some() {
            AuthMethod::AuthProvider
        } else if auth.client_certificate.is_some() || auth.client_certificate_data.is_some() {
            AuthMethod::ClientCertificate
        } else if auth.username.is_some() {
            AuthMethod::Basic
        } else {
            AuthMethod::Anonymous
        }
    }
}

/// Client configuration of the kubeconfig's current context
async fn from_kubeconfig(path: &Path) -> Result<kube::Config> {
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        Error::Connection(format!("failed to read kubeconfig {}: {}", path.display(), e))
    })?;
    let mut config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::Connection(format!(
                "failed to build config from path {}: {}",
                path.display(),
                e
            ))
        })?;

    // Without CA material the server certificate cannot be verified
    if config.root_cert.is_none() && !config.accept_invalid_certs {
        tracing::warn!(
            "kubeconfig {} has no certificate authority, skipping TLS verification",
            path.display()
        );
        config.accept_invalid_certs = true;
    }

    Ok(config)
}

fn parse_server(server: &str) -> Result<http::Uri> {
    server
        .parse::<http::Uri>()
        .map_err(|e| Error::Config(format!("invalid server address '{}': {}", server, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_kubeconfig(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config");
        std::fs::write(&path, body).unwrap();
        path
    }

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: dev-cluster
  cluster:
    server: https://10.0.0.1:6443
- name: eks
  cluster:
    server: https://ABCDEF.gr7.us-east-1.eks.amazonaws.com
    insecure-skip-tls-verify: true
contexts:
- name: dev
  context:
    cluster: dev-cluster
    user: dev-user
    namespace: team-a
- name: eks
  context:
    cluster: eks
    user: eks-user
users:
- name: dev-user
  user:
    token: abc123
- name: eks-user
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: aws
      args: ["eks", "get-token", "--cluster-name", "prod"]
"#;

    fn cluster(path: PathBuf) -> ClusterConfig {
        ClusterConfig {
            kubeconfig: Some(path),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_kubeconfig_current_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_kubeconfig(dir.path(), KUBECONFIG);

        let creds = Credentials::resolve(&cluster(path.clone())).await.unwrap();
        assert_eq!(creds.config.cluster_url.host(), Some("10.0.0.1"));
        assert_eq!(creds.config.cluster_url.port_u16(), Some(6443));
        assert_eq!(creds.auth_method(), AuthMethod::Token);
        assert_eq!(creds.namespace, "team-a");
        assert_eq!(creds.source, CredentialSource::Kubeconfig(path));
        // No CA in the kubeconfig
        assert!(creds.config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_kubeconfig_exec_user() {
        let dir = tempfile::tempdir().unwrap();
        let body = KUBECONFIG.replace("current-context: dev", "current-context: eks");
        let path = write_kubeconfig(dir.path(), &body);

        let creds = Credentials::resolve(&cluster(path)).await.unwrap();
        assert_eq!(creds.auth_method(), AuthMethod::Exec);
        let exec = creds.config.auth_info.exec.as_ref().unwrap();
        assert_eq!(exec.command.as_deref(), Some("aws"));
        assert_eq!(creds.namespace, DEFAULT_NAMESPACE);
    }

    #[tokio::test]
    async fn test_kubeconfig_missing_context() {
        let dir = tempfile::tempdir().unwrap();
        let body = KUBECONFIG.replace("current-context: dev", "current-context: prod");
        let path = write_kubeconfig(dir.path(), &body);
        assert!(matches!(
            Credentials::resolve(&cluster(path)).await,
            Err(Error::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_kubeconfig_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let result = Credentials::resolve(&cluster(dir.path().join("missing"))).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn test_resolve_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let body = KUBECONFIG.replace("current-context: dev", "current-context: eks");
        let path = write_kubeconfig(dir.path(), &body);
        let config = ClusterConfig {
            kubeconfig: Some(path),
            server: Some("https://10.9.9.9:443".to_string()),
            token: Some("override".to_string()),
            namespace: Some("audit".to_string()),
            ..Default::default()
        };

        let creds = Credentials::resolve(&config).await.unwrap();
        assert_eq!(creds.config.cluster_url.host(), Some("10.9.9.9"));
        assert_eq!(creds.auth_method(), AuthMethod::Token);
        assert!(creds.config.auth_info.exec.is_none());
        assert_eq!(creds.namespace, "audit");
    }

    #[tokio::test]
    async fn test_resolve_explicit_server() {
        let config = ClusterConfig {
            server: Some("https://api.example.com".to_string()),
            token: Some("t".to_string()),
            ..Default::default()
        };
        let creds = Credentials::resolve(&config).await.unwrap();
        assert_eq!(creds.source, CredentialSource::Explicit);
        assert_eq!(creds.config.cluster_url.host(), Some("api.example.com"));
        assert_eq!(creds.namespace, DEFAULT_NAMESPACE);
        assert!(!creds.config.accept_invalid_certs);

        let insecure = ClusterConfig {
            insecure_skip_tls_verify: true,
            ..config
        };
        let creds = Credentials::resolve(&insecure).await.unwrap();
        assert!(creds.config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_anonymous_and_invalid_server() {
        let config = ClusterConfig {
            server: Some("https://api.example.com".to_string()),
            ..Default::default()
        };
        let creds = Credentials::resolve(&config).await.unwrap();
        assert_eq!(creds.auth_method(), AuthMethod::Anonymous);

        let config = ClusterConfig {
            server: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Credentials::resolve(&config).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_debug_hides_token() {
        let config = ClusterConfig {
            server: Some("https://api.example.com".to_string()),
            token: Some("super-secret".to_string()),
            ..Default::default()
        };
        let creds = Credentials::resolve(&config).await.unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("Token"));
    }
}
