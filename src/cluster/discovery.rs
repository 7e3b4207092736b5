//! Custom API discovery
//!
//! Walks `/apis`, drops the built-in groups and lists every remaining group
//! version. Each resource is keyed `resource.group[/sub]`; the first version
//! seen for a key wins.

use super::client::ClusterClient;
use crate::error::{Error, Result};
use crate::resource::ResourceDescriptor;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Supplies the resources to scan
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    /// All resources, sorted by key
    async fn resources(&self) -> Result<Vec<ResourceDescriptor>>;
}

/// Fixed resource list
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry(pub Vec<ResourceDescriptor>);

#[async_trait]
impl ResourceRegistry for StaticRegistry {
    async fn resources(&self) -> Result<Vec<ResourceDescriptor>> {
        Ok(self.0.clone())
    }
}

/// Registry backed by the API server's discovery endpoints
pub struct ApiDiscovery {
    client: Arc<ClusterClient>,
    skip_groups: HashSet<String>,
}

impl ApiDiscovery {
    /// Discover through `client`, ignoring `skip_groups`
    pub fn new(client: Arc<ClusterClient>, skip_groups: &[String]) -> Self {
        Self {
            client,
            skip_groups: skip_groups.iter().cloned().collect(),
        }
    }

    fn is_skipped(&self, group: &str) -> bool {
        group.is_empty() || self.skip_groups.contains(group)
    }
}

#[async_trait]
impl ResourceRegistry for ApiDiscovery {
    async fn resources(&self) -> Result<Vec<ResourceDescriptor>> {
        tracing::info!("Starting to discover apis");
        let groups = self
            .client
            .kube()
            .list_api_groups()
            .await
            .map_err(|e| Error::Connection(format!("failed to list /apis: {}", e)))?;

        let mut registry = BTreeMap::new();
        for group in groups.groups {
            if self.is_skipped(&group.name) {
                continue;
            }
            for version in &group.versions {
                let list = match self
                    .client
                    .kube()
                    .list_api_group_resources(&version.group_version)
                    .await
                {
                    Ok(list) => list,
                    Err(e) => {
                        tracing::warn!(
                            "could not retrieve resource list for group version {}: {}",
                            version.group_version,
                            e
                        );
                        continue;
                    }
                };
                merge(&mut registry, &group.name, &version.version, list.resources);
            }
        }

        tracing::info!("Discovered {} custom apis", registry.len());
        Ok(registry.into_values().collect())
    }
}

/// Insert resources not yet keyed
fn merge(
    registry: &mut BTreeMap<String, ResourceDescriptor>,
    group: &str,
    version: &str,
    resources: Vec<APIResource>,
) {
    for resource in resources {
        let descriptor = ResourceDescriptor::new(group, version, resource.name, resource.namespaced);
        registry.entry(descriptor.key()).or_insert(descriptor);
    }
}
