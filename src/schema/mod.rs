//! Sensitive request-body field detection
//!
//! Builds a definition map and a create-endpoint index from the API server's
//! OpenAPI v2 document, then walks each resource's body schema with a
//! pluggable field-name classifier.
//!
//! ```text
//! /openapi/v2 → SchemaIndex (definitions + POST body refs)
//!                    ↓
//! resource URI → body schema → SchemaResolver ← FieldClassifier
//!                                    ↓
//!                       { "$.spec.credentials.password", ... }
//! ```

pub mod classifier;
pub mod document;
pub mod resolver;

pub use classifier::{FieldClassifier, PatternClassifier};
pub use document::{AdditionalProperties, OpenApiDocument, SchemaIndex, SchemaMap, SchemaNode};
pub use resolver::{SchemaResolver, SensitiveFields, PATH_ROOT};
