//! kubeapi-inspector error types

use thiserror::Error;

/// kubeapi-inspector error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cannot build a client or reach the API server
    #[error("Connection error: {0}")]
    Connection(String),

    /// OpenAPI document could not be fetched or lacks required sections
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// A resource has no resolvable request body schema
    #[error("Resource schema missing: {0}")]
    ResourceSchemaMissing(String),

    /// The API server refused the authenticated identity (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The API server did not accept the credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Non-authorization failure on a verb call
    #[error("Transport error: {0}")]
    Transport(String),

    /// A list or watch payload could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The scan was cancelled
    #[error("Cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Kubernetes client error
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Whether this error is an authorization denial rather than a failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Forbidden(_))
    }
}

/// Result type alias for kubeapi-inspector operations
pub type Result<T> = std::result::Result<T, Error>;
