//! Kubernetes-backed object store.

use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::selector::LabelSelector;
use crate::store_trait::{ObjectStore, StoreResource, object_name};

/// Object store over the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl std::fmt::Debug for KubeClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterStore").finish_non_exhaustive()
    }
}

impl KubeClusterStore {
    /// Create a store on top of an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<K: StoreResource> ObjectStore<K> for KubeClusterStore {
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<K, StoreError> {
        Ok(K::api(&self.client, namespace).get(name).await?)
    }

    async fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<K>, StoreError> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }
        let list = K::api(&self.client, namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        let api = K::api(&self.client, object.meta().namespace.as_deref());
        Ok(api.create(&PostParams::default(), object).await?)
    }

    async fn update(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let api = K::api(&self.client, object.meta().namespace.as_deref());
        Ok(api.replace(name, &PostParams::default(), object).await?)
    }

    async fn update_status(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let api = K::api(&self.client, object.meta().namespace.as_deref());

        let patch = status_merge_patch(object)?;
        Ok(api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError> {
        let api = K::api(&self.client, namespace);
        api.delete(name, &DeleteParams::default()).await?;
        debug!("Deleted {} {}", K::kind(&()), name);
        Ok(())
    }
}

/// JSON merge patch replacing `object`'s status.
///
/// Carries `metadata.resourceVersion` so a stale write is rejected with 409.
/// Keys missing from the serialized status are left untouched by the server.
pub(crate) fn status_merge_patch<K: StoreResource>(object: &K) -> Result<Value, StoreError> {
    let value = serde_json::to_value(object)?;
    Ok(serde_json::json!({
        "metadata": { "resourceVersion": object.meta().resource_version },
        "status": value.get("status").cloned().unwrap_or(Value::Null),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{Tenant, TenantSpec, TenantStatus};

    #[test]
    fn test_status_patch_sends_empty_membership() {
        let mut tenant = Tenant::new("oil", TenantSpec::default());
        tenant.metadata.resource_version = Some("7".to_string());
        tenant.status = Some(TenantStatus::default());

        let patch = status_merge_patch(&tenant).unwrap();

        assert_eq!(
            patch,
            serde_json::json!({
                "metadata": { "resourceVersion": "7" },
                "status": { "size": 0, "namespaces": [] },
            })
        );
    }
}
