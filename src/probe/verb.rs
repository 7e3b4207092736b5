//! Probe verbs and the verb client seam

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default watch window in seconds
pub const DEFAULT_WATCH_TIMEOUT_SECS: u64 = 2;

/// Host used in reproduction commands when the client has no better one
pub const DEFAULT_API_SERVER: &str = "https://kubernetes.default";

/// The three verbs compared by the prober, in probe order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    /// Point-in-time read, the baseline
    List,
    /// Bounded-duration event subscription
    Watch,
    /// Dry-run collection delete
    DeleteCollection,
}

impl Verb {
    /// Verb name as printed in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::List => "List",
            Verb::Watch => "Watch",
            Verb::DeleteCollection => "DeleteCollection",
        }
    }

    /// HTTP method used to issue the verb
    pub fn method(&self) -> &'static str {
        match self {
            Verb::List | Verb::Watch => "GET",
            Verb::DeleteCollection => "DELETE",
        }
    }

    /// Query string appended to the collection URI
    pub fn query(&self, watch_timeout_secs: u64) -> String {
        match self {
            Verb::List => String::new(),
            Verb::Watch => format!("?watch=true&timeoutSeconds={}", watch_timeout_secs),
            Verb::DeleteCollection => "?dryRun=All".to_string(),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues the probe verbs against a collection URI.
///
/// Implementations return the raw response body. An authorization denial
/// (403) must surface as [`Error::Forbidden`](crate::Error::Forbidden) so the
/// prober can tell denial from transport failure; rejected credentials (401)
/// are [`Error::Unauthorized`](crate::Error::Unauthorized).
#[async_trait]
pub trait VerbClient: Send + Sync {
    /// `GET {uri}`
    async fn list(&self, uri: &str) -> Result<Vec<u8>>;

    /// `GET {uri}?watch=true&timeoutSeconds=N`, newline-delimited events
    async fn watch(&self, uri: &str) -> Result<Vec<u8>>;

    /// `DELETE {uri}?dryRun=All`
    async fn delete_collection(&self, uri: &str) -> Result<Vec<u8>>;

    /// Watch window used by [`VerbClient::watch`]
    fn watch_timeout_secs(&self) -> u64 {
        DEFAULT_WATCH_TIMEOUT_SECS
    }

    /// Server base URL for reproduction commands
    fn base_url(&self) -> &str {
        DEFAULT_API_SERVER
    }

    /// Dispatch on `verb`
    async fn call(&self, verb: Verb, uri: &str) -> Result<Vec<u8>> {
        match verb {
            Verb::List => self.list(uri).await,
            Verb::Watch => self.watch(uri).await,
            Verb::DeleteCollection => self.delete_collection(uri).await,
        }
    }
}
