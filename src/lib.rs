//! kubeapi-inspector - Kubernetes Custom API Security Inspector
//!
//! kubeapi-inspector audits the custom (non built-in) APIs served by a
//! Kubernetes API server for two classes of weakness: request body fields
//! that look like secret material, and broken access control where Watch or
//! a dry-run DeleteCollection returns objects that List does not.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Scanner                                  │
//! │                                                                   │
//! │  ResourceRegistry ──→ ResourceDescriptor (one unit per resource)  │
//! │   (/apis discovery)            │                                  │
//! │                 ┌──────────────┴──────────────┐                   │
//! │                 ▼                             ▼                   │
//! │  ┌──────────────────────────┐  ┌──────────────────────────────┐  │
//! │  │     Schema Resolver      │  │        Access Prober          │  │
//! │  │  - /openapi/v2 index     │  │  - List baseline              │  │
//! │  │  - $ref walk, cycle cut  │  │  - Watch (2s window)          │  │
//! │  │  - FieldClassifier       │  │  - DeleteCollection dryRun    │  │
//! │  └────────────┬─────────────┘  └──────────────┬───────────────┘  │
//! │               └──────────────┬────────────────┘                   │
//! │                              ▼                                    │
//! │                   ReportSink (console / memory)                   │
//! │                              ▼                                    │
//! │                         ScanSummary                               │
//! └──────────────────────────────────────────────────────────────────┘
//!                                │ kube::Client (kubeconfig auth)
//!                         Kubernetes API server
//! ```
//!
//! ## Modules
//!
//! - [`cluster`]: credentials, raw request client and API discovery
//! - [`schema`]: OpenAPI document index and sensitive field resolution
//! - [`probe`]: differential List / Watch / DeleteCollection checks
//! - [`report`]: redaction, leak reports and sinks
//! - [`scan`]: bounded concurrent orchestration
//! - [`config`]: Configuration management

pub mod cluster;
pub mod config;
pub mod error;
pub mod probe;
pub mod report;
pub mod resource;
pub mod scan;
pub mod schema;

pub use config::InspectorConfig;
pub use error::{Error, Result};
pub use resource::ResourceDescriptor;
pub use scan::{ScanOptions, ScanSummary, Scanner};
