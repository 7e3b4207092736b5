//! API server access
//!
//! ```text
//! ClusterConfig → Credentials::resolve ──→ ClusterClient (kube::Client, raw)
//!  (kubeconfig /     (kube::Config from        │   implements VerbClient
//!   in-cluster)       kubeconfig, SA,          ├──→ /openapi/v2
//!                     explicit)                └──→ ApiDiscovery (/apis)
//! ```

pub mod client;
pub mod credentials;
pub mod discovery;

pub use client::ClusterClient;
pub use credentials::{AuthMethod, CredentialSource, Credentials, DEFAULT_NAMESPACE};
pub use discovery::{ApiDiscovery, ResourceRegistry, StaticRegistry};
