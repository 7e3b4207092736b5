//! OpenAPI v2 document model and the per-resource body schema index

use crate::error::{Error, Result};
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Prefix of local definition references
const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Path template segment used by the API server for namespaced endpoints
const NAMESPACE_TEMPLATE: &str = "{namespace}";

/// A schema node: named properties, or a reference to a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// `#/definitions/<name>` reference
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Object properties by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    /// Element schema of an array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    /// Value schema of a map
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,
}

/// `additionalProperties` is either a flag or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` / `false`
    Allowed(bool),
    /// Schema of map values
    Schema(Box<SchemaNode>),
}

impl SchemaNode {
    /// Node that only references the named definition
    pub fn reference_to(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", DEFINITIONS_PREFIX, name)),
            ..Default::default()
        }
    }

    /// Definition name this node refers to, if any
    pub fn reference_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(|r| r.strip_prefix(DEFINITIONS_PREFIX).unwrap_or(r))
    }

    /// Schema of map values, when declared
    pub fn additional_schema(&self) -> Option<&SchemaNode> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema),
            _ => None,
        }
    }
}

/// Definition name to schema node; immutable once built
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMap {
    nodes: HashMap<String, SchemaNode>,
}

impl SchemaMap {
    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.nodes.get(name)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the map holds no definitions
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<(String, SchemaNode)> for SchemaMap {
    fn from_iter<I: IntoIterator<Item = (String, SchemaNode)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// The parts of an OpenAPI v2 document the inspector reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    /// `definitions` section
    #[serde(default)]
    pub definitions: Option<SchemaMap>,

    /// `paths` section
    #[serde(default)]
    pub paths: Option<BTreeMap<String, PathItem>>,
}

/// Operations under one path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// Create operation
    #[serde(default)]
    pub post: Option<Operation>,
}

/// One operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    /// Operation parameters; shared `$ref` parameters deserialize empty
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// One operation parameter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "in", default)]
    pub location: Option<String>,
    #[serde(default)]
    pub schema: Option<SchemaNode>,
}

impl Operation {
    /// Schema of the `body` parameter
    fn body_schema(&self) -> Option<&SchemaNode> {
        self.parameters
            .iter()
            .find(|p| p.location.as_deref() == Some("body") && p.name.as_deref() == Some("body"))
            .and_then(|p| p.schema.as_ref())
    }
}

/// Definitions plus the request body schema of every create endpoint
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    definitions: SchemaMap,
    body_schemas: HashMap<String, SchemaNode>,
}

impl SchemaIndex {
    /// Build the index; fails when `definitions` or `paths` is absent
    pub fn from_document(doc: OpenApiDocument) -> Result<Self> {
        let definitions = doc.definitions.ok_or_else(|| {
            Error::SchemaUnavailable("openapi document definitions is missing".to_string())
        })?;
        let paths = doc.paths.ok_or_else(|| {
            Error::SchemaUnavailable("openapi document paths is missing".to_string())
        })?;

        let body_schemas: HashMap<String, SchemaNode> = paths
            .into_iter()
            .filter_map(|(path, item)| {
                let schema = item.post.as_ref()?.body_schema()?.clone();
                Some((path, schema))
            })
            .collect();

        tracing::debug!(
            "Indexed {} definitions and {} create endpoints",
            definitions.len(),
            body_schemas.len()
        );

        Ok(Self {
            definitions,
            body_schemas,
        })
    }

    /// Parse a JSON document and build the index
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let doc: OpenApiDocument = serde_json::from_slice(bytes).map_err(|e| {
            Error::SchemaUnavailable(format!("failed to parse openapi document: {}", e))
        })?;
        Self::from_document(doc)
    }

    /// Shared definitions
    pub fn definitions(&self) -> &SchemaMap {
        &self.definitions
    }

    /// Number of indexed create endpoints
    pub fn endpoint_count(&self) -> usize {
        self.body_schemas.len()
    }

    /// Every create endpoint with its body schema, sorted by URI
    pub fn endpoints(&self) -> Vec<(&str, &SchemaNode)> {
        let mut endpoints: Vec<_> = self
            .body_schemas
            .iter()
            .map(|(uri, schema)| (uri.as_str(), schema))
            .collect();
        endpoints.sort_by(|a, b| a.0.cmp(b.0));
        endpoints
    }

    /// Request body schema of the create endpoint at `uri`
    pub fn body_schema(&self, uri: &str) -> Option<&SchemaNode> {
        self.body_schemas.get(uri)
    }

    /// Body schema for a resource, checked to resolve to a known definition.
    ///
    /// Namespaced resources usually only expose a namespaced create path, so
    /// the templated and then the concrete namespaced path are tried after
    /// the cluster-wide one.
    pub fn resource_body_schema(
        &self,
        resource: &ResourceDescriptor,
        namespace: &str,
    ) -> Result<&SchemaNode> {
        let uri = resource.uri();
        let namespaced = || {
            [NAMESPACE_TEMPLATE, namespace]
                .into_iter()
                .find_map(|ns| self.body_schema(&resource.namespaced_uri(ns)))
        };
        let schema = self
            .body_schema(&uri)
            .or_else(|| resource.namespaced.then(namespaced).flatten())
            .ok_or_else(|| {
                Error::ResourceSchemaMissing(format!("{} not found body parameter", uri))
            })?;

        if let Some(name) = schema.reference_name() {
            if self.definitions.get(name).is_none() {
                return Err(Error::ResourceSchemaMissing(format!(
                    "{} not found ref {} schema",
                    uri, name
                )));
            }
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> serde_json::Value {
        json!({
            "swagger": "2.0",
            "definitions": {
                "com.example.v1.Account": {"properties": {
                    "spec": {"$ref": "#/definitions/com.example.v1.AccountSpec"}
                }},
                "com.example.v1.AccountSpec": {"properties": {
                    "password": {"type": "string"}
                }}
            },
            "paths": {
                "/apis/example.com/v1/accounts": {
                    "get": {"parameters": []},
                    "post": {"parameters": [
                        {"$ref": "#/parameters/pretty-tJGM1-ng"},
                        {"in": "body", "name": "body", "required": true,
                         "schema": {"$ref": "#/definitions/com.example.v1.Account"}}
                    ]}
                },
                "/apis/example.com/v1/namespaces/{namespace}/widgets": {
                    "post": {"parameters": [
                        {"in": "body", "name": "body",
                         "schema": {"$ref": "#/definitions/com.example.v1.Widget"}}
                    ]}
                },
                "/apis/example.com/v1/namespaces/default/gadgets": {
                    "post": {"parameters": [
                        {"in": "body", "name": "body",
                         "schema": {"$ref": "#/definitions/com.example.v1.Account"}}
                    ]}
                },
                "/apis/example.com/v1/accounts/{name}": {
                    "post": {"parameters": [{"in": "query", "name": "dryRun"}]}
                }
            }
        })
    }

    fn sample_index() -> SchemaIndex {
        let bytes = serde_json::to_vec(&sample_document()).unwrap();
        SchemaIndex::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_index_body_schemas() {
        let index = sample_index();
        assert_eq!(index.definitions().len(), 2);
        assert_eq!(index.endpoint_count(), 3);

        let schema = index.body_schema("/apis/example.com/v1/accounts").unwrap();
        assert_eq!(schema.reference_name(), Some("com.example.v1.Account"));
        assert!(index.body_schema("/apis/example.com/v1/accounts/{name}").is_none());

        let uris: Vec<_> = index.endpoints().into_iter().map(|(uri, _)| uri).collect();
        assert_eq!(
            uris,
            vec![
                "/apis/example.com/v1/accounts",
                "/apis/example.com/v1/namespaces/default/gadgets",
                "/apis/example.com/v1/namespaces/{namespace}/widgets",
            ]
        );
    }

    #[test]
    fn test_missing_sections() {
        let err = SchemaIndex::from_slice(br#"{"paths": {}}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaUnavailable(_)));

        let err = SchemaIndex::from_slice(br#"{"definitions": {}}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaUnavailable(_)));

        let err = SchemaIndex::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, Error::SchemaUnavailable(_)));
    }

    #[test]
    fn test_resource_body_schema() {
        let index = sample_index();
        let accounts = ResourceDescriptor::new("example.com", "v1", "accounts", false);
        assert!(index.resource_body_schema(&accounts, "default").is_ok());
    }

    #[test]
    fn test_namespaced_fallback() {
        let index = sample_index();
        let gadgets = ResourceDescriptor::new("example.com", "v1", "gadgets", true);
        let schema = index.resource_body_schema(&gadgets, "default").unwrap();
        assert_eq!(schema.reference_name(), Some("com.example.v1.Account"));

        let cluster_scoped = ResourceDescriptor::new("example.com", "v1", "gadgets", false);
        assert!(matches!(
            index.resource_body_schema(&cluster_scoped, "default"),
            Err(Error::ResourceSchemaMissing(_))
        ));
    }

    #[test]
    fn test_unresolvable_reference() {
        let index = sample_index();
        let widgets = ResourceDescriptor::new("example.com", "v1", "widgets", true);
        let err = index.resource_body_schema(&widgets, "default").unwrap_err();
        assert!(err.to_string().contains("com.example.v1.Widget"));
    }

    #[test]
    fn test_reference_name() {
        assert_eq!(
            SchemaNode::reference_to("Pod").reference_name(),
            Some("Pod")
        );
        assert_eq!(SchemaNode::default().reference_name(), None);
    }
}
