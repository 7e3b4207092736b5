//! Raw request client for the Kubernetes API server
//!
//! Requests go through a `kube::Client`, so every authentication method a
//! kubeconfig can name (tokens, exec plugins, auth providers, client
//! certificates) is honoured. Responses are read raw and their status codes
//! are mapped here.

use super::credentials::Credentials;
use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use crate::probe::{Verb, VerbClient};
use async_trait::async_trait;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use std::time::Duration;

/// Client issuing raw requests against one API server
pub struct ClusterClient {
    kube: kube::Client,
    base_url: String,
    request_timeout: Duration,
    watch_timeout_secs: u64,
}

impl ClusterClient {
    /// Build a client from resolved credentials
    pub fn new(creds: &Credentials, config: &ClusterConfig, watch_timeout_secs: u64) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs.max(1));

        let mut kube_config = creds.config.clone();
        kube_config.connect_timeout = Some(request_timeout);
        // Watch streams stay silent for up to the whole window
        kube_config.read_timeout = Some(request_timeout + Duration::from_secs(watch_timeout_secs));
        kube_config.write_timeout = Some(request_timeout);

        let kube = kube::Client::try_from(kube_config)
            .map_err(|e| Error::Connection(format!("failed to create client: {}", e)))?;

        Ok(Self {
            kube,
            base_url: creds.config.cluster_url.to_string().trim_end_matches('/').to_string(),
            request_timeout,
            watch_timeout_secs,
        })
    }

    /// The underlying client
    pub fn kube(&self) -> &kube::Client {
        &self.kube
    }

    /// `GET path`, raw body
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.send(Method::GET, path, self.request_timeout).await
    }

    /// The server's OpenAPI v2 document
    pub async fn openapi_document(&self) -> Result<Vec<u8>> {
        tracing::info!("Downloading openapi definition from {}", self.base_url);
        self.get("/openapi/v2").await
    }

    async fn send(&self, method: Method, path: &str, timeout: Duration) -> Result<Vec<u8>> {
        tracing::debug!("{} {}{}", method, self.base_url, path);

        let request = http::Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::ACCEPT, "application/json")
            .body(kube::client::Body::from(Vec::<u8>::new()))
            .map_err(|e| Error::Transport(format!("{}: {}", path, e)))?;

        let exchange = async move {
            let response = self
                .kube
                .send(request)
                .await
                .map_err(|e| Error::Transport(format!("{}: {}", path, e)))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Transport(format!("{}: {}", path, e)))?
                .to_bytes();
            Ok::<_, Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Transport(format!("{}: timed out after {:?}", path, timeout)))??;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(status_error(status, path, &body))
        }
    }
}

#[async_trait]
impl VerbClient for ClusterClient {
    async fn list(&self, uri: &str) -> Result<Vec<u8>> {
        self.get(uri).await
    }

    async fn watch(&self, uri: &str) -> Result<Vec<u8>> {
        let path = format!("{}{}", uri, Verb::Watch.query(self.watch_timeout_secs));
        // The server holds the stream open for the whole window
        let timeout = self.request_timeout + Duration::from_secs(self.watch_timeout_secs);
        self.send(Method::GET, &path, timeout).await
    }

    async fn delete_collection(&self, uri: &str) -> Result<Vec<u8>> {
        let path = format!("{}{}", uri, Verb::DeleteCollection.query(self.watch_timeout_secs));
        self.send(Method::DELETE, &path, self.request_timeout).await
    }

    fn watch_timeout_secs(&self) -> u64 {
        self.watch_timeout_secs
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Map a non-success response to an error. Only 403 is a denial; 401 means
/// the credentials themselves were rejected.
fn status_error(status: StatusCode, path: &str, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    let detail = if message.is_empty() {
        format!("{} {}", status, path)
    } else {
        format!("{} {}: {}", status, path, message)
    };

    match status {
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::UNAUTHORIZED => Error::Unauthorized(detail),
        _ => Error::Transport(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::credentials::CredentialSource;

    fn creds() -> Credentials {
        let mut config = kube::Config::new("https://10.0.0.1:6443/".parse().unwrap());
        config.accept_invalid_certs = true;
        Credentials {
            config,
            namespace: "default".to_string(),
            source: CredentialSource::Explicit,
        }
    }

    #[test]
    fn test_status_error_forbidden() {
        let body = br#"{"kind":"Status","status":"Failure","message":"secrets is forbidden: User \"system:anonymous\" cannot list resource","reason":"Forbidden","code":403}"#;
        let err = status_error(StatusCode::FORBIDDEN, "/apis/a/v1/secrets", body);
        assert!(err.is_forbidden());
        assert!(err.to_string().contains("cannot list resource"));
    }

    #[test]
    fn test_status_error_unauthorized_is_not_denial() {
        let body = br#"{"kind":"Status","status":"Failure","message":"Unauthorized","reason":"Unauthorized","code":401}"#;
        let err = status_error(StatusCode::UNAUTHORIZED, "/apis/a/v1/secrets", body);
        assert!(!err.is_forbidden());
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(
            err.to_string(),
            "Unauthorized: 401 Unauthorized /apis/a/v1/secrets: Unauthorized"
        );
    }

    #[test]
    fn test_status_error_transport() {
        let err = status_error(StatusCode::METHOD_NOT_ALLOWED, "/apis/a/v1/b?dryRun=All", b"not allowed");
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("not allowed"));

        let err = status_error(StatusCode::NOT_FOUND, "/apis/a/v1/b", b"");
        assert_eq!(err.to_string(), "Transport error: 404 Not Found /apis/a/v1/b");
    }

    #[tokio::test]
    async fn test_client_from_credentials() {
        let client = ClusterClient::new(&creds(), &ClusterConfig::default(), 5).unwrap();
        assert_eq!(client.base_url(), "https://10.0.0.1:6443");
        assert_eq!(VerbClient::watch_timeout_secs(&client), 5);
    }
}
