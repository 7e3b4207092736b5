//! API resource descriptors and URI helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// One API resource served under `/apis/{group}/{version}/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// API group (e.g. `stable.example.com`)
    pub group: String,
    /// Group version (e.g. `v1`)
    pub version: String,
    /// Plural resource name, optionally with a `/subresource` suffix
    pub name: String,
    /// Whether the resource lives inside namespaces
    pub namespaced: bool,
}

impl ResourceDescriptor {
    /// Create a descriptor
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
        namespaced: bool,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            name: name.into(),
            namespaced,
        }
    }

    /// Cluster-wide collection URI for this resource
    pub fn uri(&self) -> String {
        make_uri(&self.group, &self.version, &self.name)
    }

    /// Create URI of the resource inside a namespace
    pub fn namespaced_uri(&self, namespace: &str) -> String {
        format!(
            "/apis/{}/{}/namespaces/{}/{}",
            self.group,
            self.version,
            namespace,
            self.name.trim_end_matches('/')
        )
    }

    /// Whether the name addresses a subresource (`foos/status`, `foos/scale`)
    pub fn is_subresource(&self) -> bool {
        self.name.contains('/')
    }

    /// Whether the name addresses the status subresource
    pub fn is_status_subresource(&self) -> bool {
        is_status_subresource(&self.name)
    }

    /// Registry key, `resource.group[/subresource]`
    pub fn key(&self) -> String {
        combine_resource_group(&self.name, &self.group)
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Build `/apis/{group}/{version}/{resource}`
pub fn make_uri(group: &str, version: &str, resource: &str) -> String {
    format!("/apis/{}/{}/{}", group, version, resource.trim_end_matches('/'))
}

/// `foos/status` is a status subresource, `foos` and `foos/scale` are not
pub fn is_status_subresource(name: &str) -> bool {
    let mut parts = name.split('/');
    matches!((parts.next(), parts.next(), parts.next()), (Some(_), Some("status"), None))
}

/// Combine `foos/status` and `example.com` into `foos.example.com/status`
pub fn combine_resource_group(resource: &str, group: &str) -> String {
    if resource.is_empty() {
        return String::new();
    }

    let mut parts = resource.splitn(2, '/');
    let mut combined = parts.next().unwrap_or_default().to_string();

    if !group.is_empty() {
        combined.push('.');
        combined.push_str(group);
    }

    if let Some(sub) = parts.next() {
        combined.push('/');
        combined.push_str(sub);
    }

    combined
}
